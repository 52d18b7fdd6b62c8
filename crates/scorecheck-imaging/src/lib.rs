// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scorecheck-imaging: Image preparation for box score OCR.
//
// Provides per-image transforms (crop, grayscale, contrast, sharpen, median),
// a scan pipeline (CLAHE, adaptive and Otsu binarization, morphology, deskew),
// the fixed recipes built from them, and the dispatcher that maps an
// `Operation` to a recipe and its encoded outputs.

pub mod envelope;
pub mod image;
pub mod pipeline;
pub mod recipes;
pub mod scan;

// Re-export the primary entry points so callers can use `scorecheck_imaging::run` etc.
pub use crate::image::processor::ImageProcessor;
pub use envelope::to_envelope;
pub use pipeline::{EncodedImage, PipelineOutput, RunOptions, run};
pub use scan::deskew::{SkewEstimate, estimate_skew};
pub use scan::enhance::ScanEnhancer;
