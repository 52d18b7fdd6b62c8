// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Preparation settings: named crop presets and the constants of every recipe.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{Result, ScorecheckError};
use crate::types::CropRect;

/// Name of the built-in box score preset.
pub const NBA_2K25_PRESET: &str = "nba_2k25";

/// Box score region of a 4K NBA 2K25 post-game capture.
pub const NBA_2K25_BOX_SCORE: CropRect = CropRect::new(1214, 430, 2267, 1209);

/// Local threshold weighting used by adaptive binarization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptiveMethod {
    /// Unweighted box mean over the block.
    Mean,
    /// Gaussian-weighted mean over the block.
    Gaussian,
}

/// Contrast-limited adaptive histogram equalization settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaheParams {
    /// Histogram clip limit, relative to a uniform histogram.
    pub clip_limit: f32,
    /// Number of tile columns.
    pub tiles_x: u32,
    /// Number of tile rows.
    pub tiles_y: u32,
}

impl ClaheParams {
    pub const fn new(clip_limit: f32, tiles_x: u32, tiles_y: u32) -> Self {
        Self {
            clip_limit,
            tiles_x,
            tiles_y,
        }
    }
}

impl Default for ClaheParams {
    fn default() -> Self {
        Self::new(2.0, 8, 8)
    }
}

/// `preprocess_ocr` constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardOcrParams {
    pub contrast: f32,
    pub median_size: u32,
    pub brightness: f32,
    pub jpeg_quality: u8,
}

impl Default for StandardOcrParams {
    fn default() -> Self {
        Self {
            contrast: 1.5,
            median_size: 3,
            brightness: 1.1,
            jpeg_quality: 95,
        }
    }
}

/// `preprocess_ocr_alternative` constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlternativeOcrParams {
    pub contrast: f32,
    pub threshold: u8,
}

impl Default for AlternativeOcrParams {
    fn default() -> Self {
        Self {
            contrast: 0.8,
            threshold: 128,
        }
    }
}

/// `multiple_versions` constants. The standard and enhanced variants reuse
/// the `preprocess_ocr` and `preprocess_ocr_alternative` settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultipleVersionsParams {
    /// Fixed cut of the plain `binary` variant.
    pub plain_threshold: u8,
}

impl Default for MultipleVersionsParams {
    fn default() -> Self {
        Self {
            plain_threshold: 128,
        }
    }
}

/// `preprocess_binary_ocr` constants: skew estimation, cleanup and binarization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinaryOcrParams {
    pub canny_low: f32,
    pub canny_high: f32,
    pub hough_vote_threshold: u32,
    /// Lower bound on segment length; the effective minimum is
    /// `max(min_line_length, width / min_line_width_divisor)`.
    pub min_line_length: u32,
    pub min_line_width_divisor: u32,
    pub max_line_gap: u32,
    /// Only the first `max_lines` detected segments vote on the angle.
    pub max_lines: usize,
    pub max_skew_degrees: f64,
    pub median_size: u32,
    pub clahe: ClaheParams,
    pub method: AdaptiveMethod,
    pub block_size: u32,
    pub offset: i32,
    pub jpeg_quality: u8,
}

impl Default for BinaryOcrParams {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            hough_vote_threshold: 200,
            min_line_length: 300,
            min_line_width_divisor: 5,
            max_line_gap: 15,
            max_lines: 800,
            max_skew_degrees: 15.0,
            median_size: 3,
            clahe: ClaheParams::default(),
            method: AdaptiveMethod::Gaussian,
            block_size: 31,
            offset: 10,
            jpeg_quality: 95,
        }
    }
}

impl BinaryOcrParams {
    /// Minimum segment length for an image `width` pixels wide.
    pub fn min_line_length_for(&self, width: u32) -> u32 {
        let scaled = width / self.min_line_width_divisor.max(1);
        self.min_line_length.max(scaled)
    }
}

/// `otsu_ocr` constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtsuOcrParams {
    pub clahe: ClaheParams,
    pub close_radius: u8,
}

impl Default for OtsuOcrParams {
    fn default() -> Self {
        Self {
            clahe: ClaheParams::default(),
            close_radius: 1,
        }
    }
}

/// `adaptive_threshold` constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveThresholdParams {
    pub method: AdaptiveMethod,
    pub block_size: u32,
    pub offset: i32,
}

impl Default for AdaptiveThresholdParams {
    fn default() -> Self {
        Self {
            method: AdaptiveMethod::Gaussian,
            block_size: 11,
            offset: 2,
        }
    }
}

/// `enhanced_binary` constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancedBinaryParams {
    pub clahe: ClaheParams,
    pub blur_size: u32,
    pub method: AdaptiveMethod,
    pub block_size: u32,
    pub offset: i32,
    pub open_radius: u8,
    pub close_radius: u8,
}

impl Default for EnhancedBinaryParams {
    fn default() -> Self {
        Self {
            clahe: ClaheParams::new(3.0, 16, 16),
            blur_size: 3,
            method: AdaptiveMethod::Gaussian,
            block_size: 21,
            offset: 11,
            open_radius: 1,
            close_radius: 1,
        }
    }
}

/// `multi_level` constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiLevelParams {
    pub levels: Vec<u8>,
}

impl Default for MultiLevelParams {
    fn default() -> Self {
        Self {
            levels: vec![50, 150, 200],
        }
    }
}

/// Complete preparation settings. Every field falls back to its default when
/// absent from a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepConfig {
    /// Named capture layouts for `crop_box_score`.
    pub crop_presets: BTreeMap<String, CropRect>,
    /// Preset used by `crop_box_score` when the caller names none.
    pub box_score_preset: String,
    /// JPEG quality of cropped output.
    pub crop_jpeg_quality: u8,
    pub standard: StandardOcrParams,
    pub alternative: AlternativeOcrParams,
    pub multiple_versions: MultipleVersionsParams,
    pub binary_ocr: BinaryOcrParams,
    pub otsu: OtsuOcrParams,
    pub adaptive: AdaptiveThresholdParams,
    pub enhanced: EnhancedBinaryParams,
    pub multi_level: MultiLevelParams,
}

impl Default for PrepConfig {
    fn default() -> Self {
        let mut crop_presets = BTreeMap::new();
        crop_presets.insert(NBA_2K25_PRESET.to_string(), NBA_2K25_BOX_SCORE);
        Self {
            crop_presets,
            box_score_preset: NBA_2K25_PRESET.to_string(),
            crop_jpeg_quality: 90,
            standard: StandardOcrParams::default(),
            alternative: AlternativeOcrParams::default(),
            multiple_versions: MultipleVersionsParams::default(),
            binary_ocr: BinaryOcrParams::default(),
            otsu: OtsuOcrParams::default(),
            adaptive: AdaptiveThresholdParams::default(),
            enhanced: EnhancedBinaryParams::default(),
            multi_level: MultiLevelParams::default(),
        }
    }
}

impl PrepConfig {
    /// Load settings from a JSON file and validate them.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ScorecheckError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        info!(
            presets = config.crop_presets.len(),
            box_score_preset = %config.box_score_preset,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Look up a crop preset by name.
    pub fn preset(&self, name: &str) -> Result<CropRect> {
        self.crop_presets.get(name).copied().ok_or_else(|| {
            ScorecheckError::InvalidParameter(format!("unknown crop preset: {name}"))
        })
    }

    /// Rectangle `crop_box_score` uses by default.
    pub fn box_score_rect(&self) -> Result<CropRect> {
        self.preset(&self.box_score_preset)
    }

    /// Reject settings no recipe can run with.
    pub fn validate(&self) -> Result<()> {
        self.box_score_rect().map_err(|_| {
            ScorecheckError::Config(format!(
                "box_score_preset '{}' is not defined in crop_presets",
                self.box_score_preset
            ))
        })?;
        if let Some((name, _)) = self.crop_presets.iter().find(|(_, rect)| rect.is_empty()) {
            return Err(ScorecheckError::Config(format!(
                "crop preset '{name}' has zero width or height"
            )));
        }

        check_quality("crop_jpeg_quality", self.crop_jpeg_quality)?;
        check_quality("standard.jpeg_quality", self.standard.jpeg_quality)?;
        check_quality("binary_ocr.jpeg_quality", self.binary_ocr.jpeg_quality)?;

        check_window("standard.median_size", self.standard.median_size)?;
        check_window("binary_ocr.median_size", self.binary_ocr.median_size)?;
        check_window("binary_ocr.block_size", self.binary_ocr.block_size)?;
        check_window("adaptive.block_size", self.adaptive.block_size)?;
        check_window("enhanced.block_size", self.enhanced.block_size)?;
        check_window("enhanced.blur_size", self.enhanced.blur_size)?;

        check_clahe("binary_ocr.clahe", &self.binary_ocr.clahe)?;
        check_clahe("otsu.clahe", &self.otsu.clahe)?;
        check_clahe("enhanced.clahe", &self.enhanced.clahe)?;

        if self.binary_ocr.canny_low > self.binary_ocr.canny_high {
            return Err(ScorecheckError::Config(
                "binary_ocr.canny_low must not exceed canny_high".into(),
            ));
        }
        if self.multi_level.levels.is_empty() {
            return Err(ScorecheckError::Config(
                "multi_level.levels must name at least one threshold".into(),
            ));
        }

        debug!("Configuration validated");
        Ok(())
    }
}

fn check_quality(field: &str, quality: u8) -> Result<()> {
    if (1..=100).contains(&quality) {
        Ok(())
    } else {
        Err(ScorecheckError::Config(format!(
            "{field} must be within 1..=100, got {quality}"
        )))
    }
}

/// Sliding windows need a centre pixel.
fn check_window(field: &str, size: u32) -> Result<()> {
    if size >= 3 && size % 2 == 1 {
        Ok(())
    } else {
        Err(ScorecheckError::Config(format!(
            "{field} must be an odd number >= 3, got {size}"
        )))
    }
}

fn check_clahe(field: &str, params: &ClaheParams) -> Result<()> {
    if params.clip_limit <= 0.0 || params.tiles_x == 0 || params.tiles_y == 0 {
        return Err(ScorecheckError::Config(format!(
            "{field} needs a positive clip limit and tile grid, got {params:?}"
        )));
    }
    Ok(())
}
