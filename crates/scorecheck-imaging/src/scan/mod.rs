// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan pipeline: local contrast equalization, binarization, morphology and
// skew correction for captured screens.

pub mod clahe;
pub mod deskew;
pub mod enhance;

pub use deskew::{SkewEstimate, estimate_skew};
pub use enhance::ScanEnhancer;
