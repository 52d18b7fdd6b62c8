// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Low-level grayscale filters shared by the processor and the scan pipeline:
// BT.601 luma, fixed 3x3 convolutions and sized Gaussian windows.

use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::filter::separable_filter_equal;

/// A 3x3 integer convolution kernel with a divisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kernel3x3 {
    /// Row-major weights.
    pub weights: [i32; 9],
    pub scale: i32,
}

/// High-pass sharpening kernel.
pub const SHARPEN: Kernel3x3 = Kernel3x3 {
    weights: [-2, -2, -2, -2, 32, -2, -2, -2, -2],
    scale: 16,
};

/// Edge enhancement kernel (mild unsharp mask).
pub const EDGE_ENHANCE: Kernel3x3 = Kernel3x3 {
    weights: [-1, -1, -1, -1, 10, -1, -1, -1, -1],
    scale: 2,
};

/// Convert to 8-bit luma using ITU-R BT.601 weights (0.299, 0.587, 0.114).
///
/// The `image` crate's own `to_luma8` uses Rec. 709 weights; screen captures
/// prepared for OCR are calibrated against BT.601.
pub fn luma_bt601(image: &DynamicImage) -> GrayImage {
    if let DynamicImage::ImageLuma8(gray) = image {
        return gray.clone();
    }
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        // 16.16 fixed point, rounded.
        let l = (r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16;
        Luma([l.min(255) as u8])
    })
}

/// Convolve with a 3x3 kernel. The one-pixel border is copied unchanged.
pub fn convolve3x3(gray: &GrayImage, kernel: &Kernel3x3) -> GrayImage {
    let (w, h) = gray.dimensions();
    let mut out = gray.clone();
    if w < 3 || h < 3 {
        return out;
    }

    let scale = kernel.scale as f32;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut acc = 0i32;
            for ky in 0..3u32 {
                for kx in 0..3u32 {
                    let p = gray.get_pixel(x + kx - 1, y + ky - 1).0[0] as i32;
                    acc += p * kernel.weights[(ky * 3 + kx) as usize];
                }
            }
            let value = (acc as f32 / scale + 0.5).clamp(0.0, 255.0);
            out.put_pixel(x, y, Luma([value as u8]));
        }
    }
    out
}

/// Standard deviation used for a Gaussian window of `size` taps when none is
/// given explicitly.
pub fn default_sigma(size: u32) -> f32 {
    0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalised 1-D Gaussian kernel of `size` taps.
pub fn gaussian_kernel(size: u32, sigma: f32) -> Vec<f32> {
    let half = (size / 2) as i32;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-half..=half)
        .map(|i| (-((i * i) as f32) / two_sigma_sq).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// Gaussian-weighted local mean of every pixel over a `size` x `size` window,
/// with edge-replicated borders. Returned row-major as floats.
pub fn gaussian_local_mean(gray: &GrayImage, size: u32) -> Vec<f32> {
    let kernel = gaussian_kernel(size, default_sigma(size));
    let (w, h) = gray.dimensions();
    let levels: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(w, h, |x, y| Luma([gray.get_pixel(x, y).0[0] as f32]));
    separable_filter_equal(&levels, &kernel).into_raw()
}

/// Blur with a `size` x `size` Gaussian window.
pub fn gaussian_blur_sized(gray: &GrayImage, size: u32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let smoothed = gaussian_local_mean(gray, size);
    GrayImage::from_fn(w, h, |x, y| {
        let v = smoothed[(y * w + x) as usize];
        Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}
