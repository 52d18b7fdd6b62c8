// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the scorecheck-imaging crate. Covers the binary OCR
// recipe end to end and skew estimation on its own, both on a synthetic ruled
// page tilted by two degrees.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;

use scorecheck_core::config::BinaryOcrParams;
use scorecheck_imaging::recipes;
use scorecheck_imaging::{ScanEnhancer, estimate_skew};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A 1200x600 light page with eight dark rules falling 2 degrees to the right.
fn tilted_page() -> DynamicImage {
    let (width, height) = (1200u32, 600u32);
    let mut rgb = RgbImage::from_pixel(width, height, Rgb([235, 235, 230]));
    let rise = 1100.0 * 2f32.to_radians().tan();
    for i in 0..8 {
        let y = 60.0 + i as f32 * 60.0;
        for t in 0..3 {
            let y = y + t as f32;
            draw_line_segment_mut(&mut rgb, (50.0, y), (1150.0, y + rise), Rgb([20, 20, 20]));
        }
    }
    DynamicImage::ImageRgb8(rgb)
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Full binary OCR recipe: deskew, CLAHE, adaptive threshold, invert.
fn bench_binary_ocr(c: &mut Criterion) {
    let page = tilted_page();
    let params = BinaryOcrParams::default();

    c.bench_function("binary_ocr (1200x600)", |b| {
        b.iter(|| {
            let out = recipes::binary_ocr(black_box(&page), &params, false);
            black_box(out.binary_ocr);
        });
    });
}

/// Skew estimation alone (Canny, Hough, segment tracing, median).
fn bench_estimate_skew(c: &mut Criterion) {
    let gray = ScanEnhancer::from_dynamic(&tilted_page()).into_gray();
    let params = BinaryOcrParams::default();

    c.bench_function("estimate_skew (1200x600)", |b| {
        b.iter(|| black_box(estimate_skew(black_box(&gray), &params)));
    });
}

criterion_group!(benches, bench_binary_ocr, bench_estimate_skew);
criterion_main!(benches);
