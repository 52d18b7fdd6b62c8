// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Operation dispatcher: decodes the input once, runs the recipe an
// `Operation` selects and encodes its outputs.

use std::collections::BTreeMap;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use scorecheck_core::error::ScorecheckError;
use scorecheck_core::{CropRect, Dimensions, Operation, OutputEncoding, PrepConfig};
use tracing::{debug, info, instrument};

use crate::image::processor::{ImageProcessor, encode_to_format};
use crate::recipes;

/// Caller-supplied knobs that are not part of the configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Explicit crop rectangle for `crop`.
    pub crop: Option<CropRect>,
    /// Named crop preset, overriding the configured box score preset.
    pub preset: Option<String>,
    /// Median denoise before equalization in `preprocess_binary_ocr`.
    pub denoise: bool,
}

/// An encoded output image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub encoding: OutputEncoding,
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    fn png_gray(gray: GrayImage) -> Result<Self, ScorecheckError> {
        Ok(Self {
            encoding: OutputEncoding::Png,
            bytes: encode_to_format(&DynamicImage::ImageLuma8(gray), ImageFormat::Png)?,
        })
    }

    fn jpeg_gray(gray: GrayImage, quality: u8) -> Result<Self, ScorecheckError> {
        Ok(Self {
            encoding: OutputEncoding::Jpeg,
            bytes: ImageProcessor::from_dynamic(DynamicImage::ImageLuma8(gray))
                .to_jpeg_bytes(quality)?,
        })
    }

    fn jpeg_rgb(rgb: RgbImage, quality: u8) -> Result<Self, ScorecheckError> {
        Ok(Self {
            encoding: OutputEncoding::Jpeg,
            bytes: ImageProcessor::from_dynamic(DynamicImage::ImageRgb8(rgb))
                .to_jpeg_bytes(quality)?,
        })
    }
}

/// Result of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutput {
    Single(EncodedImage),
    Variants(BTreeMap<String, EncodedImage>),
    Dimensions(Dimensions),
}

/// Run `operation` over the encoded `input` image.
///
/// Nothing partial is returned: the first failing step aborts the run.
#[instrument(skip(input, options, config), fields(input_len = input.len()))]
pub fn run(
    operation: Operation,
    input: &[u8],
    options: &RunOptions,
    config: &PrepConfig,
) -> Result<PipelineOutput, ScorecheckError> {
    let decode = || decode_for(operation, input);

    let output = match operation {
        Operation::Dimensions => PipelineOutput::Dimensions(recipes::probe_dimensions(input)?),
        Operation::Crop => {
            let rect = match (&options.crop, &options.preset) {
                (Some(rect), _) => *rect,
                (None, Some(name)) => config.preset(name)?,
                (None, None) => config.box_score_rect()?,
            };
            single(EncodedImage::jpeg_rgb(
                recipes::crop(decode()?, rect)?,
                config.crop_jpeg_quality,
            )?)
        }
        Operation::CropBoxScore => {
            let rect = match &options.preset {
                Some(name) => config.preset(name)?,
                None => config.box_score_rect()?,
            };
            single(EncodedImage::jpeg_rgb(
                recipes::crop(decode()?, rect)?,
                config.crop_jpeg_quality,
            )?)
        }
        Operation::PreprocessOcr => single(EncodedImage::jpeg_gray(
            recipes::standard_ocr(decode()?, &config.standard),
            config.standard.jpeg_quality,
        )?),
        Operation::PreprocessOcrAlternative => single(EncodedImage::png_gray(
            recipes::alternative_ocr(decode()?, &config.alternative),
        )?),
        Operation::MultipleVersions => {
            let versions = recipes::multiple_versions(
                &decode()?,
                &config.standard,
                &config.alternative,
                &config.multiple_versions,
            );
            variants([
                (
                    "standard",
                    EncodedImage::jpeg_gray(versions.standard, config.standard.jpeg_quality)?,
                ),
                ("enhanced", EncodedImage::png_gray(versions.enhanced)?),
                ("binary", EncodedImage::png_gray(versions.binary)?),
            ])
        }
        Operation::PreprocessBinaryOcr => {
            let out = recipes::binary_ocr(&decode()?, &config.binary_ocr, options.denoise);
            debug!(
                angle = out.skew.angle_degrees,
                detected = out.skew.segments_detected,
                used = out.skew.segments_used,
                "Skew corrected"
            );
            variants([
                ("binary_ocr", EncodedImage::png_gray(out.binary_ocr)?),
                (
                    "deskewed",
                    EncodedImage::jpeg_rgb(out.deskewed, config.binary_ocr.jpeg_quality)?,
                ),
                (
                    "enhanced_grayscale",
                    EncodedImage::png_gray(out.enhanced_grayscale)?,
                ),
                ("threshold", EncodedImage::png_gray(out.threshold)?),
            ])
        }
        Operation::OtsuOcr => single(EncodedImage::png_gray(recipes::otsu_ocr(
            &decode()?,
            &config.otsu,
        ))?),
        Operation::AdaptiveThreshold => single(EncodedImage::png_gray(
            recipes::adaptive_threshold(&decode()?, &config.adaptive),
        )?),
        Operation::EnhancedBinary => single(EncodedImage::png_gray(recipes::enhanced_binary(
            &decode()?,
            &config.enhanced,
        ))?),
        Operation::MultiLevel => single(EncodedImage::png_gray(recipes::multi_level(
            &decode()?,
            &config.multi_level,
        ))?),
    };

    Ok(output)
}

/// Decode `input` for `operation`. The crop, binarization and deskew recipes
/// see the image upright as its EXIF orientation tag describes it; the
/// enhancement recipes work on the pixels in stored order.
fn decode_for(operation: Operation, input: &[u8]) -> Result<DynamicImage, ScorecheckError> {
    let processor = match operation {
        Operation::PreprocessOcr
        | Operation::PreprocessOcrAlternative
        | Operation::MultipleVersions
        | Operation::Dimensions => ImageProcessor::from_bytes(input)?,
        Operation::Crop
        | Operation::CropBoxScore
        | Operation::PreprocessBinaryOcr
        | Operation::OtsuOcr
        | Operation::AdaptiveThreshold
        | Operation::EnhancedBinary
        | Operation::MultiLevel => ImageProcessor::from_bytes_upright(input)?,
    };
    info!(
        width = processor.width(),
        height = processor.height(),
        "Running preparation recipe"
    );
    Ok(processor.into_dynamic())
}

fn single(image: EncodedImage) -> PipelineOutput {
    PipelineOutput::Single(image)
}

fn variants<const N: usize>(named: [(&str, EncodedImage); N]) -> PipelineOutput {
    PipelineOutput::Variants(
        named
            .into_iter()
            .map(|(name, image)| (name.to_string(), image))
            .collect(),
    )
}

// -- Tests --------------------------------------------------------------------

/// Every operation against a generated post-game capture.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::processor::jpeg_with_orientation;
    use image::Rgb;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;
    use scorecheck_core::ErrorKind;

    /// Dark broadcast frame with a light box score panel of dark glyphs.
    fn capture_png(width: u32, height: u32) -> Vec<u8> {
        let mut rgb = RgbImage::from_pixel(width, height, Rgb([18, 22, 40]));
        let (left, top) = (width as i32 / 4, height as i32 / 5);
        let panel = Rect::at(left, top).of_size(width * 9 / 16, height * 3 / 5);
        draw_filled_rect_mut(&mut rgb, panel, Rgb([226, 228, 232]));
        for row in 0..12 {
            for col in 0..10 {
                let glyph = Rect::at(
                    panel.left() + 12 + col * (panel.width() as i32 / 10),
                    panel.top() + 10 + row * (panel.height() as i32 / 12),
                )
                .of_size(10, 6);
                draw_filled_rect_mut(&mut rgb, glyph, Rgb([30, 30, 30]));
            }
        }
        encode_to_format(&DynamicImage::ImageRgb8(rgb), ImageFormat::Png).unwrap()
    }

    fn decode(encoded: &EncodedImage) -> DynamicImage {
        let format = match encoded.encoding {
            OutputEncoding::Png => ImageFormat::Png,
            OutputEncoding::Jpeg => ImageFormat::Jpeg,
        };
        image::load_from_memory_with_format(&encoded.bytes, format).unwrap()
    }

    fn expect_single(output: PipelineOutput) -> EncodedImage {
        match output {
            PipelineOutput::Single(image) => image,
            other => panic!("expected a single image, got {other:?}"),
        }
    }

    fn expect_variants(output: PipelineOutput) -> BTreeMap<String, EncodedImage> {
        match output {
            PipelineOutput::Variants(map) => map,
            other => panic!("expected variants, got {other:?}"),
        }
    }

    #[test]
    fn every_operation_runs_on_a_capture() {
        let input = capture_png(640, 360);
        let config = PrepConfig::default();
        let options = RunOptions {
            crop: Some(CropRect::new(160, 72, 360, 216)),
            ..RunOptions::default()
        };

        for operation in Operation::ALL {
            if operation == Operation::CropBoxScore {
                continue;
            }
            let output = run(operation, &input, &options, &config)
                .unwrap_or_else(|err| panic!("{operation} failed: {err}"));
            match output {
                PipelineOutput::Single(image) => {
                    decode(&image);
                }
                PipelineOutput::Variants(map) => {
                    assert!(map.len() >= 3, "{operation}");
                    map.values().for_each(|image| {
                        decode(image);
                    });
                }
                PipelineOutput::Dimensions(dims) => assert_eq!(dims.width, 640),
            }
        }
    }

    #[test]
    fn dimensions_match_the_capture() {
        let output = run(
            Operation::Dimensions,
            &capture_png(321, 123),
            &RunOptions::default(),
            &PrepConfig::default(),
        )
        .unwrap();
        assert_eq!(
            output,
            PipelineOutput::Dimensions(Dimensions {
                width: 321,
                height: 123
            })
        );
    }

    #[test]
    fn crop_box_score_on_4k_capture() {
        let input = encode_to_format(
            &DynamicImage::ImageRgb8(RgbImage::new(4000, 2000)),
            ImageFormat::Png,
        )
        .unwrap();
        let image = expect_single(
            run(
                Operation::CropBoxScore,
                &input,
                &RunOptions::default(),
                &PrepConfig::default(),
            )
            .unwrap(),
        );
        assert_eq!(image.encoding, OutputEncoding::Jpeg);
        let decoded = decode(&image);
        assert_eq!((decoded.width(), decoded.height()), (2267, 1209));
    }

    #[test]
    fn crop_box_score_on_small_capture_is_out_of_bounds() {
        let err = run(
            Operation::CropBoxScore,
            &capture_png(640, 360),
            &RunOptions::default(),
            &PrepConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
    }

    #[test]
    fn crop_uses_named_preset_without_coordinates() {
        let mut config = PrepConfig::default();
        config
            .crop_presets
            .insert("corner".into(), CropRect::new(0, 0, 64, 32));
        let options = RunOptions {
            preset: Some("corner".into()),
            ..RunOptions::default()
        };
        let image =
            expect_single(run(Operation::Crop, &capture_png(640, 360), &options, &config).unwrap());
        let decoded = decode(&image);
        assert_eq!((decoded.width(), decoded.height()), (64, 32));
    }

    #[test]
    fn unknown_preset_is_invalid_parameter() {
        let options = RunOptions {
            preset: Some("nba_1999".into()),
            ..RunOptions::default()
        };
        let err = run(
            Operation::CropBoxScore,
            &capture_png(64, 64),
            &options,
            &PrepConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn multiple_versions_returns_three_named_outputs() {
        let map = expect_variants(
            run(
                Operation::MultipleVersions,
                &capture_png(200, 120),
                &RunOptions::default(),
                &PrepConfig::default(),
            )
            .unwrap(),
        );
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, ["binary", "enhanced", "standard"]);
        assert_eq!(map["standard"].encoding, OutputEncoding::Jpeg);
        assert_eq!(map["binary"].encoding, OutputEncoding::Png);
    }

    #[test]
    fn binary_ocr_outputs_and_encodings() {
        let map = expect_variants(
            run(
                Operation::PreprocessBinaryOcr,
                &capture_png(320, 180),
                &RunOptions {
                    denoise: true,
                    ..RunOptions::default()
                },
                &PrepConfig::default(),
            )
            .unwrap(),
        );
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            ["binary_ocr", "deskewed", "enhanced_grayscale", "threshold"]
        );
        assert_eq!(map["deskewed"].encoding, OutputEncoding::Jpeg);
        let binary = decode(&map["binary_ocr"]).into_luma8();
        assert!(binary.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn alternative_output_is_two_valued_png() {
        let image = expect_single(
            run(
                Operation::PreprocessOcrAlternative,
                &capture_png(200, 120),
                &RunOptions::default(),
                &PrepConfig::default(),
            )
            .unwrap(),
        );
        assert_eq!(image.encoding, OutputEncoding::Png);
        let gray = decode(&image).into_luma8();
        assert!(gray.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn preprocess_ocr_of_white_image_is_grayscale_jpeg() {
        let input = encode_to_format(
            &DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]))),
            ImageFormat::Png,
        )
        .unwrap();
        let image = expect_single(
            run(
                Operation::PreprocessOcr,
                &input,
                &RunOptions::default(),
                &PrepConfig::default(),
            )
            .unwrap(),
        );
        assert_eq!(image.encoding, OutputEncoding::Jpeg);
        let decoded = decode(&image);
        assert_eq!(decoded.color(), image::ColorType::L8);
        assert_eq!((decoded.width(), decoded.height()), (100, 100));
    }

    /// 40x20 landscape pixels tagged to display as 20x40 portrait.
    fn rotated_phone_jpeg() -> Vec<u8> {
        let rgb = RgbImage::from_fn(40, 20, |x, _| Rgb([(x * 6) as u8, 90, 140]));
        jpeg_with_orientation(&DynamicImage::ImageRgb8(rgb), 6)
    }

    #[test]
    fn crop_sees_exif_rotated_capture_upright() {
        let options = RunOptions {
            crop: Some(CropRect::new(0, 0, 20, 40)),
            ..RunOptions::default()
        };
        let image = expect_single(
            run(
                Operation::Crop,
                &rotated_phone_jpeg(),
                &options,
                &PrepConfig::default(),
            )
            .unwrap(),
        );
        let decoded = decode(&image);
        assert_eq!((decoded.width(), decoded.height()), (20, 40));
    }

    #[test]
    fn binarization_recipes_follow_exif_rotation() {
        let input = rotated_phone_jpeg();
        for operation in [Operation::OtsuOcr, Operation::MultiLevel] {
            let image = expect_single(
                run(operation, &input, &RunOptions::default(), &PrepConfig::default()).unwrap(),
            );
            let decoded = decode(&image);
            assert_eq!((decoded.width(), decoded.height()), (20, 40), "{operation}");
        }
    }

    #[test]
    fn enhancement_recipes_and_dimensions_keep_stored_orientation() {
        let input = rotated_phone_jpeg();
        let config = PrepConfig::default();
        let dims = run(Operation::Dimensions, &input, &RunOptions::default(), &config).unwrap();
        assert_eq!(
            dims,
            PipelineOutput::Dimensions(Dimensions {
                width: 40,
                height: 20
            })
        );
        let image = expect_single(
            run(Operation::PreprocessOcr, &input, &RunOptions::default(), &config).unwrap(),
        );
        let decoded = decode(&image);
        assert_eq!((decoded.width(), decoded.height()), (40, 20));
    }

    #[test]
    fn undecodable_input_fails_every_operation() {
        for operation in Operation::ALL {
            let err = run(
                operation,
                b"\x89PNG but not really",
                &RunOptions::default(),
                &PrepConfig::default(),
            )
            .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::DecodeFailure, "{operation}");
        }
    }
}
