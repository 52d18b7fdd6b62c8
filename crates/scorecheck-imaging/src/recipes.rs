// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fixed preparation recipes. Each recipe is a linear chain of processor and
// scan-enhancer steps over a decoded image; encoding happens in the pipeline.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageReader, RgbImage};
use scorecheck_core::config::{
    AdaptiveThresholdParams, AlternativeOcrParams, BinaryOcrParams, EnhancedBinaryParams,
    MultiLevelParams, MultipleVersionsParams, OtsuOcrParams, StandardOcrParams,
};
use scorecheck_core::error::ScorecheckError;
use scorecheck_core::{CropRect, Dimensions};
use tracing::{debug, info, instrument};

use crate::image::filters;
use crate::image::processor::ImageProcessor;
use crate::scan::deskew::{self, SkewEstimate};
use crate::scan::enhance::ScanEnhancer;

/// Crop to `rect`, always producing a color image.
pub fn crop(image: DynamicImage, rect: CropRect) -> Result<RgbImage, ScorecheckError> {
    let cropped = ImageProcessor::from_dynamic(image).crop(rect)?;
    Ok(cropped.into_dynamic().to_rgb8())
}

/// Grayscale, contrast stretch, sharpen, median, edge enhance, brighten.
#[instrument(skip_all)]
pub fn standard_ocr(image: DynamicImage, params: &StandardOcrParams) -> GrayImage {
    ImageProcessor::from_dynamic(image)
        .grayscale()
        .adjust_contrast(params.contrast)
        .sharpen()
        .median(params.median_size)
        .edge_enhance()
        .scale_brightness(params.brightness)
        .into_dynamic()
        .into_luma8()
}

/// Grayscale, softened contrast, sharpen, fixed threshold.
#[instrument(skip_all)]
pub fn alternative_ocr(image: DynamicImage, params: &AlternativeOcrParams) -> GrayImage {
    ImageProcessor::from_dynamic(image)
        .grayscale()
        .adjust_contrast(params.contrast)
        .sharpen()
        .threshold(params.threshold)
        .into_dynamic()
        .into_luma8()
}

/// Grayscale and fixed threshold, nothing else.
pub fn plain_binary(image: DynamicImage, level: u8) -> GrayImage {
    ImageProcessor::from_dynamic(image)
        .grayscale()
        .threshold(level)
        .into_dynamic()
        .into_luma8()
}

/// The three ensemble variants of `multiple_versions`.
pub struct Versions {
    pub standard: GrayImage,
    pub enhanced: GrayImage,
    pub binary: GrayImage,
}

#[instrument(skip_all)]
pub fn multiple_versions(
    image: &DynamicImage,
    standard: &StandardOcrParams,
    alternative: &AlternativeOcrParams,
    versions: &MultipleVersionsParams,
) -> Versions {
    Versions {
        standard: standard_ocr(image.clone(), standard),
        enhanced: alternative_ocr(image.clone(), alternative),
        binary: plain_binary(image.clone(), versions.plain_threshold),
    }
}

/// Everything the binary OCR recipe produces.
pub struct BinaryOcrOutput {
    /// Skew that was measured and undone.
    pub skew: SkewEstimate,
    /// Inverted binary image: light text on dark, the OCR input.
    pub binary_ocr: GrayImage,
    /// Source rotated level, full color.
    pub deskewed: RgbImage,
    /// Equalized grayscale before binarization.
    pub enhanced_grayscale: GrayImage,
    /// Binary image before inversion.
    pub threshold: GrayImage,
}

/// Deskew, optional denoise, CLAHE, adaptive threshold, invert.
#[instrument(skip(image, params), fields(width = image.width(), height = image.height()))]
pub fn binary_ocr(
    image: &DynamicImage,
    params: &BinaryOcrParams,
    denoise: bool,
) -> BinaryOcrOutput {
    let source_gray = filters::luma_bt601(image);
    let skew = deskew::estimate_skew(&source_gray, params);
    let deskewed = deskew::deskew(&image.to_rgb8(), skew.angle_degrees);

    let mut enhancer = ScanEnhancer::from_dynamic(&DynamicImage::ImageRgb8(deskewed.clone()));
    if denoise {
        enhancer = enhancer.median(params.median_size);
    }
    let enhanced = enhancer.equalize(&params.clahe);
    let enhanced_grayscale = enhanced.as_gray().clone();

    let threshold = enhanced
        .binarize(params.method, params.block_size, params.offset)
        .into_gray();
    let binary_ocr = ScanEnhancer::from_gray(threshold.clone())
        .invert()
        .into_gray();

    info!(angle = skew.angle_degrees, denoise, "Binary OCR preparation complete");
    BinaryOcrOutput {
        skew,
        binary_ocr,
        deskewed,
        enhanced_grayscale,
        threshold,
    }
}

/// CLAHE, Otsu threshold, close, invert.
#[instrument(skip_all)]
pub fn otsu_ocr(image: &DynamicImage, params: &OtsuOcrParams) -> GrayImage {
    ScanEnhancer::from_dynamic(image)
        .equalize(&params.clahe)
        .binarize_otsu()
        .close(params.close_radius)
        .invert()
        .into_gray()
}

/// Adaptive threshold only.
#[instrument(skip_all)]
pub fn adaptive_threshold(image: &DynamicImage, params: &AdaptiveThresholdParams) -> GrayImage {
    ScanEnhancer::from_dynamic(image)
        .binarize(params.method, params.block_size, params.offset)
        .into_gray()
}

/// Strong CLAHE, blur, adaptive threshold, open, close, invert.
#[instrument(skip_all)]
pub fn enhanced_binary(image: &DynamicImage, params: &EnhancedBinaryParams) -> GrayImage {
    ScanEnhancer::from_dynamic(image)
        .equalize(&params.clahe)
        .blur(params.blur_size)
        .binarize(params.method, params.block_size, params.offset)
        .open(params.open_radius)
        .close(params.close_radius)
        .invert()
        .into_gray()
}

/// Union of several fixed thresholds.
#[instrument(skip_all)]
pub fn multi_level(image: &DynamicImage, params: &MultiLevelParams) -> GrayImage {
    ScanEnhancer::from_dynamic(image)
        .binarize_union(&params.levels)
        .into_gray()
}

/// Read width and height from the image header without decoding pixels.
pub fn probe_dimensions(data: &[u8]) -> Result<Dimensions, ScorecheckError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|err| ScorecheckError::Decode(err.to_string()))?;
    if reader.format().is_none() {
        return Err(ScorecheckError::Decode("unrecognized image format".into()));
    }
    let (width, height) = reader
        .into_dimensions()
        .map_err(|err| ScorecheckError::Decode(err.to_string()))?;
    debug!(width, height, "Probed image header");
    Ok(Dimensions { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;
    use scorecheck_core::config::NBA_2K25_BOX_SCORE;

    fn two_valued(gray: &GrayImage) -> bool {
        gray.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255)
    }

    /// Dark stat-table text on a light panel.
    fn scoreboard(width: u32, height: u32) -> DynamicImage {
        let mut rgb = RgbImage::from_pixel(width, height, Rgb([215, 220, 225]));
        for row in 0..(height / 20).saturating_sub(1) {
            for col in 0..(width / 30).saturating_sub(1) {
                let rect = Rect::at(10 + col as i32 * 30, 8 + row as i32 * 20).of_size(12, 8);
                draw_filled_rect_mut(&mut rgb, rect, Rgb([25, 25, 35]));
            }
        }
        DynamicImage::ImageRgb8(rgb)
    }

    #[test]
    fn crop_box_score_region_of_4k_capture() {
        let capture = DynamicImage::ImageRgb8(RgbImage::new(4000, 2000));
        let out = crop(capture, NBA_2K25_BOX_SCORE).unwrap();
        assert_eq!(out.dimensions(), (2267, 1209));
    }

    #[test]
    fn full_frame_crop_is_identity() {
        let source = scoreboard(90, 60).to_rgb8();
        let out = crop(
            DynamicImage::ImageRgb8(source.clone()),
            CropRect::new(0, 0, 90, 60),
        )
        .unwrap();
        assert_eq!(out, source);
    }

    #[test]
    fn alternative_and_plain_binary_are_two_valued() {
        let image = scoreboard(120, 80);
        assert!(two_valued(&alternative_ocr(
            image.clone(),
            &AlternativeOcrParams::default()
        )));
        assert!(two_valued(&plain_binary(image, 128)));
    }

    #[test]
    fn binary_version_uses_its_own_threshold() {
        // Panel luma is about 219: above the alternative cut, below the plain one.
        let image = scoreboard(120, 80);
        let alternative = AlternativeOcrParams {
            contrast: 1.0,
            threshold: 128,
        };
        let versions = multiple_versions(
            &image,
            &StandardOcrParams::default(),
            &alternative,
            &MultipleVersionsParams {
                plain_threshold: 230,
            },
        );
        assert_eq!(versions.binary.get_pixel(2, 2).0[0], 0);
        assert_eq!(versions.enhanced.get_pixel(2, 2).0[0], 255);
    }

    #[test]
    fn plain_binary_separates_text_from_panel() {
        let out = plain_binary(scoreboard(120, 80), 128);
        assert_eq!(out.get_pixel(12, 10).0[0], 0);
        assert_eq!(out.get_pixel(2, 2).0[0], 255);
    }

    #[test]
    fn binary_ocr_on_blank_page_leaves_source_untouched() {
        let source = scoreboard(200, 120);
        let out = binary_ocr(&source, &BinaryOcrParams::default(), false);
        assert_eq!(out.skew.angle_degrees, 0.0);
        assert_eq!(out.deskewed, source.to_rgb8());
        assert!(two_valued(&out.threshold));
        assert!(two_valued(&out.binary_ocr));
        for (inverted, plain) in out.binary_ocr.pixels().zip(out.threshold.pixels()) {
            assert_eq!(inverted.0[0], 255 - plain.0[0]);
        }
        assert_eq!(out.enhanced_grayscale.dimensions(), (200, 120));
    }

    #[test]
    fn binary_ocr_renders_text_light_on_dark() {
        let out = binary_ocr(&scoreboard(200, 120), &BinaryOcrParams::default(), true);
        // Centre of a glyph block and open panel between rows.
        assert_eq!(out.binary_ocr.get_pixel(16, 12).0[0], 255);
        assert_eq!(out.binary_ocr.get_pixel(100, 4).0[0], 0);
    }

    #[test]
    fn supplemented_recipes_produce_binary_images() {
        let image = scoreboard(160, 100);
        let outputs = [
            otsu_ocr(&image, &OtsuOcrParams::default()),
            adaptive_threshold(&image, &AdaptiveThresholdParams::default()),
            enhanced_binary(&image, &EnhancedBinaryParams::default()),
            multi_level(&image, &MultiLevelParams::default()),
        ];
        for out in &outputs {
            assert_eq!(out.dimensions(), (160, 100));
            assert!(two_valued(out));
        }
    }

    #[test]
    fn otsu_ocr_inverts_text() {
        let out = otsu_ocr(&scoreboard(160, 100), &OtsuOcrParams::default());
        assert_eq!(out.get_pixel(16, 12).0[0], 255);
    }

    #[test]
    fn probe_reads_header_dimensions() {
        let mut png = Vec::new();
        DynamicImage::ImageLuma8(GrayImage::from_pixel(37, 21, Luma([9])))
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        assert_eq!(
            probe_dimensions(&png).unwrap(),
            Dimensions {
                width: 37,
                height: 21
            }
        );
    }

    #[test]
    fn probe_rejects_garbage() {
        let err = probe_dimensions(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ScorecheckError::Decode(_)));
    }
}
