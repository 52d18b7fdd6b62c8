// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan enhancement pipeline: local contrast equalization, adaptive and global
// binarization, morphological cleanup and polarity inversion for captured
// box score screens.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::filter::median_filter;
use imageproc::morphology;
use scorecheck_core::config::{AdaptiveMethod, ClaheParams};
use tracing::{debug, info, instrument};

use crate::image::filters;
use crate::image::processor::threshold_gray;
use crate::scan::clahe::clahe;

/// Enhances grayscale captures for OCR.
///
/// Every step consumes `self` and returns the transformed enhancer, so a
/// recipe reads top to bottom:
///
/// ```ignore
/// let binary = ScanEnhancer::from_dynamic(&capture)
///     .equalize(&ClaheParams::new(2.0, 8, 8))
///     .binarize(AdaptiveMethod::Gaussian, 31, 10)
///     .invert()
///     .into_gray();
/// ```
pub struct ScanEnhancer {
    /// The working image.
    image: GrayImage,
}

impl ScanEnhancer {
    // -- Construction ---------------------------------------------------------

    /// Start from any decoded image; color input is reduced to BT.601 luma.
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        Self {
            image: filters::luma_bt601(image),
        }
    }

    /// Wrap an existing grayscale image.
    pub fn from_gray(image: GrayImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    /// Borrow the current working image.
    pub fn as_gray(&self) -> &GrayImage {
        &self.image
    }

    /// Consume the enhancer and return the working image.
    pub fn into_gray(self) -> GrayImage {
        self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        DynamicImage::ImageLuma8(self.image)
    }

    // -- Cleanup --------------------------------------------------------------

    /// Edge-preserving median denoise over a `size` x `size` window.
    #[instrument(skip(self))]
    pub fn median(self, size: u32) -> Self {
        let radius = size / 2;
        debug!(radius, "Median denoise");
        Self {
            image: median_filter(&self.image, radius, radius),
        }
    }

    /// Gaussian blur over a `size` x `size` window.
    #[instrument(skip(self))]
    pub fn blur(self, size: u32) -> Self {
        Self {
            image: filters::gaussian_blur_sized(&self.image, size),
        }
    }

    /// Flatten uneven lighting with contrast-limited adaptive histogram
    /// equalization.
    #[instrument(skip(self))]
    pub fn equalize(self, params: &ClaheParams) -> Self {
        info!(
            clip_limit = params.clip_limit,
            tiles_x = params.tiles_x,
            tiles_y = params.tiles_y,
            "Equalizing local contrast"
        );
        Self {
            image: clahe(&self.image, params),
        }
    }

    // -- Binarization ---------------------------------------------------------

    /// Apply adaptive thresholding to produce a black-and-white image.
    ///
    /// For each pixel the threshold is the local mean over a `block_size`
    /// window (box or Gaussian weighted), minus a constant `c`. Pixels above
    /// the local threshold become white; the rest become black.
    #[instrument(skip(self))]
    pub fn binarize(self, method: AdaptiveMethod, block_size: u32, c: i32) -> Self {
        info!(?method, block_size, c, "Applying adaptive binarization");

        let (width, height) = self.image.dimensions();
        let local_means: Vec<f32> = match method {
            AdaptiveMethod::Gaussian => filters::gaussian_local_mean(&self.image, block_size),
            AdaptiveMethod::Mean => {
                let integral = compute_integral_image(&self.image);
                let radius = block_size / 2;
                (0..height)
                    .flat_map(|y| (0..width).map(move |x| (x, y)))
                    .map(|(x, y)| region_mean(&integral, width, height, x, y, radius) as f32)
                    .collect()
            }
        };

        let output = GrayImage::from_fn(width, height, |x, y| {
            let local_mean = local_means[(y * width + x) as usize].round() as i32;
            let pixel_val = self.image.get_pixel(x, y).0[0] as i32;
            let white = pixel_val > local_mean - c;
            Luma([if white { 255u8 } else { 0u8 }])
        });

        debug!("Binarization complete");
        Self { image: output }
    }

    /// Global binarization at the Otsu threshold.
    ///
    /// Computes the threshold automatically from the image histogram via Otsu's
    /// method; pixels above it become white.
    #[instrument(skip(self))]
    pub fn binarize_otsu(self) -> Self {
        let threshold = otsu_threshold(&self.image);
        info!(threshold, "Applying Otsu binarization");
        self.binarize_above(threshold)
    }

    /// Pixels strictly above `level` become white, the rest black.
    pub fn binarize_above(self, level: u8) -> Self {
        let image = match level.checked_add(1) {
            Some(next) => threshold_gray(&self.image, next),
            None => GrayImage::new(self.image.width(), self.image.height()),
        };
        Self { image }
    }

    /// Union of several global thresholds: white wherever any level's
    /// binarization is white.
    #[instrument(skip(self))]
    pub fn binarize_union(self, levels: &[u8]) -> Self {
        let mut combined = GrayImage::new(self.image.width(), self.image.height());
        for &level in levels {
            let layer = Self::from_gray(self.image.clone())
                .binarize_above(level)
                .image;
            for (out, px) in combined.pixels_mut().zip(layer.pixels()) {
                out.0[0] |= px.0[0];
            }
        }
        debug!(levels = levels.len(), "Threshold layers combined");
        Self { image: combined }
    }

    // -- Morphology -----------------------------------------------------------

    /// Morphological opening (erode then dilate): removes white specks no
    /// larger than the structuring element.
    #[instrument(skip(self))]
    pub fn open(self, radius: u8) -> Self {
        Self {
            image: morphology::open(&self.image, Norm::LInf, radius),
        }
    }

    /// Morphological closing (dilate then erode): fills black gaps inside
    /// white strokes.
    #[instrument(skip(self))]
    pub fn close(self, radius: u8) -> Self {
        Self {
            image: morphology::close(&self.image, Norm::LInf, radius),
        }
    }

    /// Swap polarity so dark text on a light screen becomes light on dark.
    pub fn invert(mut self) -> Self {
        for pixel in self.image.pixels_mut() {
            pixel.0[0] = 255 - pixel.0[0];
        }
        self
    }
}

// -- Integral image helpers ---------------------------------------------------

/// Compute the integral (summed-area table) of a grayscale image.
///
/// `integral[y * (width+1) + x]` contains the sum of all pixel values in the
/// rectangle [0, 0) to (x, y) (exclusive on both axes). The table has
/// dimensions `(width+1) x (height+1)` with a zero-padded border.
fn compute_integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];

    for y in 0..h {
        let mut row_sum: u64 = 0;
        for x in 0..w {
            row_sum += gray.get_pixel(x, y).0[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            let above = y as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[above];
        }
    }

    table
}

/// Compute the mean pixel value within a square region centred on (cx, cy)
/// with the given radius, using the precomputed integral image.
fn region_mean(
    integral: &[u64],
    img_width: u32,
    img_height: u32,
    cx: u32,
    cy: u32,
    radius: u32,
) -> f64 {
    let stride = (img_width + 1) as usize;

    // Clamp the region to image bounds.
    let x1 = cx.saturating_sub(radius) as usize;
    let y1 = cy.saturating_sub(radius) as usize;
    let x2 = ((cx + radius + 1) as usize).min(img_width as usize);
    let y2 = ((cy + radius + 1) as usize).min(img_height as usize);

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    if area == 0.0 {
        return 128.0;
    }

    // S = I[y2][x2] - I[y1][x2] - I[y2][x1] + I[y1][x1]
    let sum = integral[y2 * stride + x2] as f64
        - integral[y1 * stride + x2] as f64
        - integral[y2 * stride + x1] as f64
        + integral[y1 * stride + x1] as f64;

    sum / area
}

/// Compute the Otsu threshold for a grayscale image.
///
/// Finds the threshold value that maximises the between-class variance of the
/// dark and light pixel groups.
pub fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total_pixels = gray.width() as u64 * gray.height() as u64;
    if total_pixels == 0 {
        return 128;
    }

    let mut sum_total: f64 = 0.0;
    for (i, &count) in histogram.iter().enumerate() {
        sum_total += i as f64 * count as f64;
    }

    let mut sum_background: f64 = 0.0;
    let mut weight_background: u64 = 0;
    let mut max_variance: f64 = 0.0;
    let mut best_threshold: u8 = 0;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;

        let between_variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if between_variance > max_variance {
            max_variance = between_variance;
            best_threshold = t as u8;
        }
    }

    best_threshold
}

// -- Tests --------------------------------------------------------------------
