// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for ScoreCheck image preparation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, ScorecheckError};

/// Axis-aligned crop region in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub const fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Parse a rectangle from a JSON object such as
    /// `{"left": 10, "top": 20, "width": 300, "height": 200}`.
    pub fn from_json(raw: &str) -> Result<Self, ScorecheckError> {
        serde_json::from_str(raw).map_err(|err| {
            ScorecheckError::InvalidParameter(format!("malformed crop coordinates: {err}"))
        })
    }

    /// Right edge (exclusive), or `None` on overflow.
    pub fn right(&self) -> Option<u32> {
        self.left.checked_add(self.width)
    }

    /// Bottom edge (exclusive), or `None` on overflow.
    pub fn bottom(&self) -> Option<u32> {
        self.top.checked_add(self.height)
    }

    /// True when the rectangle lies entirely inside a `width` x `height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        matches!(self.right(), Some(r) if r <= width)
            && matches!(self.bottom(), Some(b) if b <= height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for CropRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(left={}, top={}, width={}, height={})",
            self.left, self.top, self.width, self.height
        )
    }
}

/// Fixed preparation recipe selected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Crop to a caller-supplied rectangle.
    Crop,
    /// Crop to the configured box score preset.
    CropBoxScore,
    /// Grayscale, contrast, sharpen, median, edge enhance, brightness.
    PreprocessOcr,
    /// Grayscale, softened contrast, sharpen, fixed threshold.
    PreprocessOcrAlternative,
    /// Standard + alternative + plain binary, for ensemble OCR.
    MultipleVersions,
    /// Report pixel width and height.
    Dimensions,
    /// Deskew, CLAHE, adaptive threshold, invert.
    PreprocessBinaryOcr,
    /// CLAHE, Otsu threshold, close, invert.
    OtsuOcr,
    /// Gaussian adaptive threshold only.
    AdaptiveThreshold,
    /// Strong CLAHE, blur, adaptive threshold, open, close, invert.
    EnhancedBinary,
    /// Union of three fixed thresholds.
    MultiLevel,
}

impl Operation {
    pub const ALL: [Operation; 11] = [
        Self::Crop,
        Self::CropBoxScore,
        Self::PreprocessOcr,
        Self::PreprocessOcrAlternative,
        Self::MultipleVersions,
        Self::Dimensions,
        Self::PreprocessBinaryOcr,
        Self::OtsuOcr,
        Self::AdaptiveThreshold,
        Self::EnhancedBinary,
        Self::MultiLevel,
    ];

    /// Selector string accepted on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Crop => "crop",
            Self::CropBoxScore => "crop_box_score",
            Self::PreprocessOcr => "preprocess_ocr",
            Self::PreprocessOcrAlternative => "preprocess_ocr_alternative",
            Self::MultipleVersions => "multiple_versions",
            Self::Dimensions => "dimensions",
            Self::PreprocessBinaryOcr => "preprocess_binary_ocr",
            Self::OtsuOcr => "otsu_ocr",
            Self::AdaptiveThreshold => "adaptive_threshold",
            Self::EnhancedBinary => "enhanced_binary",
            Self::MultiLevel => "multi_level",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ScorecheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ScorecheckError::UnknownOperation(s.to_string()))
    }
}

/// Pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Container format of an encoded output image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputEncoding {
    Png,
    Jpeg,
}

impl OutputEncoding {
    /// File extension used when writing this encoding to disk.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

/// Payload of a successful envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeData {
    /// One base64-encoded image.
    Image(String),
    /// Named base64-encoded images.
    Variants(BTreeMap<String, String>),
    Dimensions(Dimensions),
}

/// JSON result handed back to the calling process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<EnvelopeData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl ResultEnvelope {
    pub fn ok(data: EnvelopeData) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            kind: None,
        }
    }

    pub fn failure(err: &ScorecheckError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.to_string()),
            kind: Some(err.kind()),
        }
    }

    /// Process exit status mirroring `success`.
    pub fn exit_code(&self) -> u8 {
        if self.success { 0 } else { 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_bounds_rect_fits() {
        let rect = CropRect::new(0, 0, 640, 480);
        assert!(rect.fits_within(640, 480));
        assert!(!CropRect::new(1, 0, 640, 480).fits_within(640, 480));
        assert!(!CropRect::new(0, 1, 640, 480).fits_within(640, 480));
    }

    #[test]
    fn overflowing_rect_does_not_fit() {
        let rect = CropRect::new(u32::MAX, 0, 2, 2);
        assert!(rect.right().is_none());
        assert!(!rect.fits_within(u32::MAX, u32::MAX));
    }

    #[test]
    fn rect_parses_from_json() {
        let json = r#"{"left":1214,"top":430,"width":2267,"height":1209}"#;
        let rect = CropRect::from_json(json).unwrap();
        assert_eq!(rect, CropRect::new(1214, 430, 2267, 1209));
    }

    #[test]
    fn malformed_rect_json_is_invalid_parameter() {
        let err = CropRect::from_json(r#"{"left":"ten"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn every_operation_round_trips_through_its_selector() {
        for op in Operation::ALL {
            assert_eq!(op.as_str().parse::<Operation>().unwrap(), op);
        }
    }

    #[test]
    fn unknown_selector_is_rejected() {
        let err = "sharpen_more".parse::<Operation>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownOperation);
        assert!(err.to_string().contains("sharpen_more"));
    }

    #[test]
    fn failure_envelope_omits_data() {
        let envelope = ResultEnvelope::failure(&ScorecheckError::Decode("truncated".into()));
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["kind"], "decode_failure");
        assert!(json.get("data").is_none());
        assert_eq!(envelope.exit_code(), 1);
    }

    #[test]
    fn dimensions_envelope_shape() {
        let envelope = ResultEnvelope::ok(EnvelopeData::Dimensions(Dimensions {
            width: 100,
            height: 50,
        }));
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["data"]["width"], 100);
        assert_eq!(json["data"]["height"], 50);
        assert!(json.get("error").is_none());
        assert_eq!(envelope.exit_code(), 0);
    }
}
