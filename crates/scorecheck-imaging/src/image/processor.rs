// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: decode, crop, grayscale, contrast/brightness, sharpening
// and median filtering. Operates on in-memory images using the `image` and
// `imageproc` crates.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageDecoder, ImageFormat, ImageReader, Luma};
use imageproc::filter::median_filter;
use scorecheck_core::error::ScorecheckError;
use scorecheck_core::{CropRect, Dimensions};
use tracing::{debug, info, instrument};

use super::filters::{self, EDGE_ENHANCE, SHARPEN};

/// Image processing pipeline operating on a single in-memory image.
///
/// All operations are non-destructive: each method consumes `self` and returns a
/// new `ImageProcessor` wrapping the transformed image, enabling method chaining.
///
/// ```ignore
/// let jpeg = ImageProcessor::from_bytes(&capture)?
///     .grayscale()
///     .adjust_contrast(1.5)
///     .sharpen()
///     .to_jpeg_bytes(95)?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Read and decode an image file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, ScorecheckError> {
        let data = std::fs::read(path.as_ref()).map_err(|source| ScorecheckError::InputRead {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        let processor = Self::from_bytes(&data)?;
        info!(
            width = processor.width(),
            height = processor.height(),
            "Image loaded"
        );
        Ok(processor)
    }

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    ///
    /// Pixels are kept in stored order; any EXIF orientation tag is ignored.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, ScorecheckError> {
        let img = image::load_from_memory(data).map_err(decode_error)?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Create a processor from raw encoded bytes, rotating and flipping the
    /// pixels as the EXIF orientation tag says a viewer would display them.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes_upright(data: &[u8]) -> Result<Self, ScorecheckError> {
        let mut decoder = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|err| ScorecheckError::Decode(err.to_string()))?
            .into_decoder()
            .map_err(decode_error)?;
        let orientation = decoder.orientation().map_err(decode_error)?;
        let mut img = DynamicImage::from_decoder(decoder).map_err(decode_error)?;
        img.apply_orientation(orientation);
        debug!(
            width = img.width(),
            height = img.height(),
            ?orientation,
            "Image decoded upright"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    /// Borrow the underlying `DynamicImage`.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Consume the processor and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Crop a rectangular region from the image.
    ///
    /// The rectangle must lie entirely inside the image; it is never clipped.
    #[instrument(skip(self), fields(rect = %rect))]
    pub fn crop(self, rect: CropRect) -> Result<Self, ScorecheckError> {
        if rect.is_empty() {
            return Err(ScorecheckError::InvalidParameter(format!(
                "crop rectangle {rect} has zero area"
            )));
        }
        let (img_w, img_h) = (self.width(), self.height());
        if !rect.fits_within(img_w, img_h) {
            return Err(ScorecheckError::OutOfBounds {
                rect,
                width: img_w,
                height: img_h,
            });
        }

        info!(from_w = img_w, from_h = img_h, "Cropping image");
        let cropped = self
            .image
            .crop_imm(rect.left, rect.top, rect.width, rect.height);
        Ok(Self { image: cropped })
    }

    /// Convert the image to 8-bit grayscale (BT.601 luma).
    #[instrument(skip(self))]
    pub fn grayscale(self) -> Self {
        debug!("Converting to grayscale");
        Self {
            image: DynamicImage::ImageLuma8(filters::luma_bt601(&self.image)),
        }
    }

    /// Scale brightness by `factor`. 1.0 is a no-op, 0.0 yields black.
    #[instrument(skip(self), fields(factor))]
    pub fn scale_brightness(self, factor: f32) -> Self {
        debug!(factor, "Scaling brightness");
        self.map_channels(|channel| (channel as f32 * factor).clamp(0.0, 255.0) as u8)
    }

    /// Adjust contrast by a factor around the image's mean gray level.
    /// Values > 1.0 increase contrast; values < 1.0 flatten it towards the mean.
    /// A value of 1.0 is a no-op.
    #[instrument(skip(self), fields(factor))]
    pub fn adjust_contrast(self, factor: f32) -> Self {
        let mean = mean_gray_level(&filters::luma_bt601(&self.image));
        debug!(factor, mean, "Adjusting contrast");

        self.map_channels(|channel| {
            let val = mean + factor * (channel as f32 - mean);
            val.clamp(0.0, 255.0) as u8
        })
    }

    /// Apply a 3x3 high-pass sharpening filter to the luma channel.
    #[instrument(skip(self))]
    pub fn sharpen(self) -> Self {
        let gray = filters::luma_bt601(&self.image);
        Self {
            image: DynamicImage::ImageLuma8(filters::convolve3x3(&gray, &SHARPEN)),
        }
    }

    /// Apply a 3x3 edge enhancement filter to the luma channel.
    #[instrument(skip(self))]
    pub fn edge_enhance(self) -> Self {
        let gray = filters::luma_bt601(&self.image);
        Self {
            image: DynamicImage::ImageLuma8(filters::convolve3x3(&gray, &EDGE_ENHANCE)),
        }
    }

    /// Median filter over a `size` x `size` window (`size` odd).
    #[instrument(skip(self), fields(size))]
    pub fn median(self, size: u32) -> Self {
        let radius = size / 2;
        let image = match &self.image {
            DynamicImage::ImageLuma8(gray) => {
                DynamicImage::ImageLuma8(median_filter(gray, radius, radius))
            }
            other => DynamicImage::ImageRgb8(median_filter(&other.to_rgb8(), radius, radius)),
        };
        Self { image }
    }

    /// Binarize the luma channel at a fixed level: values below `level`
    /// become 0, everything else 255.
    #[instrument(skip(self), fields(level))]
    pub fn threshold(self, level: u8) -> Self {
        let gray = filters::luma_bt601(&self.image);
        Self {
            image: DynamicImage::ImageLuma8(threshold_gray(&gray, level)),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    /// Grayscale images stay single-channel; anything else is encoded as RGB.
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, ScorecheckError> {
        let mut buffer = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
        let result = match &self.image {
            DynamicImage::ImageLuma8(gray) => gray.write_with_encoder(encoder),
            other => other.to_rgb8().write_with_encoder(encoder),
        };
        result.map_err(|err| ScorecheckError::Encode(format!("JPEG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// Apply `f` to every color channel, keeping grayscale images grayscale.
    fn map_channels(self, f: impl Fn(u8) -> u8) -> Self {
        let image = match self.image {
            DynamicImage::ImageLuma8(mut gray) => {
                for pixel in gray.pixels_mut() {
                    pixel.0[0] = f(pixel.0[0]);
                }
                DynamicImage::ImageLuma8(gray)
            }
            other => {
                let mut rgba = other.to_rgba8();
                for pixel in rgba.pixels_mut() {
                    let image::Rgba([r, g, b, a]) = *pixel;
                    *pixel = image::Rgba([f(r), f(g), f(b), a]);
                }
                DynamicImage::ImageRgba8(rgba)
            }
        };
        Self { image }
    }
}

fn decode_error(err: image::ImageError) -> ScorecheckError {
    ScorecheckError::Decode(err.to_string())
}

/// Map values below `level` to 0 and the rest to 255.
pub fn threshold_gray(gray: &GrayImage, level: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let val = gray.get_pixel(x, y).0[0];
        Luma([if val < level { 0u8 } else { 255u8 }])
    })
}

/// Rounded mean gray level.
fn mean_gray_level(gray: &GrayImage) -> f32 {
    let count = gray.width() as u64 * gray.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = gray.pixels().map(|p| p.0[0] as u64).sum();
    (sum as f64 / count as f64 + 0.5).floor() as f32
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
pub(crate) fn encode_to_format(
    image: &DynamicImage,
    format: ImageFormat,
) -> Result<Vec<u8>, ScorecheckError> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| ScorecheckError::Encode(format!("{:?} encoding failed: {}", format, err)))?;
    Ok(buffer)
}

/// JPEG bytes of `image` with an EXIF APP1 segment carrying `orientation`
/// spliced in after the SOI marker.
#[cfg(test)]
pub(crate) fn jpeg_with_orientation(image: &DynamicImage, orientation: u8) -> Vec<u8> {
    let jpeg = ImageProcessor::from_dynamic(image.clone())
        .to_jpeg_bytes(95)
        .unwrap();
    let mut app1 = vec![0xFF, 0xE1, 0x00, 0x22];
    app1.extend_from_slice(b"Exif\0\0");
    // Big-endian TIFF header, first IFD at offset 8.
    app1.extend_from_slice(b"MM\0\x2A\0\0\0\x08");
    app1.extend_from_slice(&[0x00, 0x01]);
    // Tag 0x0112 (Orientation), SHORT, count 1.
    app1.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
    app1.extend_from_slice(&[0x00, orientation, 0x00, 0x00]);
    app1.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&app1);
    out.extend_from_slice(&jpeg[2..]);
    out
}

// -- Tests --------------------------------------------------------------------
