//! Image transformer backed by the `image` crate.
//!
//! # Design Decisions
//!
//! - **Output keeps the source format**: a PNG in gives a PNG out. JPEG output
//!   uses the configured quality.
//!
//! - **Contain never upscales** unless the transformer is built with
//!   [`ImageTransformer::with_upscale`]. Widen and Heighten always hit the
//!   requested edge exactly.
//!
//! - **Crops are clamped**: the rectangle is intersected with the image. Only a
//!   rectangle that misses the image entirely is an error.
//!
//! - **Pass-through skips decoding**: the source bytes are returned as is.
//!
//! - **Resize output is bounded**: a resize whose result (or, for cover, whose
//!   scaled image before cropping) exceeds the pixel budget fails with
//!   [`TransformError::TooLarge`] before anything is allocated.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};

use super::{detect_format, TransformEngine, TransformedImage};
use crate::error::TransformError;
use crate::params::{ResizeMode, TransformRequest};

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

/// Default cap on the pixels a resize may produce (25 megapixels).
pub const DEFAULT_MAX_OUTPUT_PIXELS: u64 = 25_000_000;

const FILTER: FilterType = FilterType::Lanczos3;

/// Production [`TransformEngine`].
///
/// # Example
///
/// ```ignore
/// use skinwalker::transform::{ImageTransformer, TransformEngine};
/// use skinwalker::params::{ResizeMode, TransformRequest};
///
/// let transformer = ImageTransformer::new().with_jpeg_quality(85);
/// let request = TransformRequest::Resize {
///     mode: ResizeMode::Widen,
///     width: Some(300),
///     height: None,
/// };
/// let output = transformer.apply(&source_bytes, &request)?;
/// ```
#[derive(Debug, Clone)]
pub struct ImageTransformer {
    jpeg_quality: u8,
    allow_upscale: bool,
    max_output_pixels: u64,
}

impl ImageTransformer {
    /// Create a transformer with default quality and no upscaling.
    pub fn new() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            allow_upscale: false,
            max_output_pixels: DEFAULT_MAX_OUTPUT_PIXELS,
        }
    }

    /// Set the JPEG output quality, clamped to 1-100.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY);
        self
    }

    /// Allow `contain` to enlarge images smaller than the box.
    pub fn with_upscale(mut self, allow: bool) -> Self {
        self.allow_upscale = allow;
        self
    }

    /// Cap the number of pixels a resize may produce. Zero is treated as one.
    pub fn with_max_output_pixels(mut self, max: u64) -> Self {
        self.max_output_pixels = max.max(1);
        self
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    pub fn max_output_pixels(&self) -> u64 {
        self.max_output_pixels
    }

    fn check_size(&self, width: u64, height: u64) -> Result<(), TransformError> {
        if width.saturating_mul(height) > self.max_output_pixels {
            return Err(TransformError::TooLarge {
                width,
                height,
                max_pixels: self.max_output_pixels,
            });
        }
        Ok(())
    }

    fn decode(&self, source: &[u8]) -> Result<DynamicImage, TransformError> {
        let reader = ImageReader::new(Cursor::new(source))
            .with_guessed_format()
            .map_err(|e| TransformError::DecodeError {
                message: e.to_string(),
            })?;

        reader.decode().map_err(|e| TransformError::DecodeError {
            message: e.to_string(),
        })
    }

    fn encode(&self, img: &DynamicImage, format: ImageFormat) -> Result<Bytes, TransformError> {
        let mut output = Vec::new();

        let result = match format {
            ImageFormat::Jpeg => {
                let mut encoder = JpegEncoder::new_with_quality(&mut output, self.jpeg_quality);
                encoder.encode_image(img)
            }
            _ => img.write_to(&mut Cursor::new(&mut output), format),
        };

        result.map_err(|e| TransformError::EncodeError {
            message: e.to_string(),
        })?;

        Ok(Bytes::from(output))
    }

    fn resize(
        &self,
        img: &DynamicImage,
        mode: ResizeMode,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<DynamicImage, TransformError> {
        let (src_w, src_h) = img.dimensions();

        let resized = match (mode, width, height) {
            (ResizeMode::Contain, Some(w), Some(h)) => {
                let (out_w, out_h) = contain_dimensions(src_w, src_h, w, h, self.allow_upscale);
                if (out_w, out_h) == (src_w, src_h) {
                    return Ok(img.clone());
                }
                self.check_size(out_w.into(), out_h.into())?;
                img.resize_exact(out_w, out_h, FILTER)
            }
            (ResizeMode::Widen, Some(w), _) => {
                let out_h = scale_edge(src_h, w, src_w);
                self.check_size(w.into(), out_h.into())?;
                img.resize_exact(w, out_h, FILTER)
            }
            (ResizeMode::Heighten, _, Some(h)) => {
                let out_w = scale_edge(src_w, h, src_h);
                self.check_size(out_w.into(), h.into())?;
                img.resize_exact(out_w, h, FILTER)
            }
            (ResizeMode::Cover, Some(w), Some(h)) => {
                // resize_to_fill scales to cover the box before cropping
                let (fill_w, fill_h) = fill_dimensions(src_w, src_h, w, h);
                self.check_size(fill_w, fill_h)?;
                img.resize_to_fill(w, h, FILTER)
            }
            // Parameter validation guarantees the dimensions each mode needs
            _ => img.clone(),
        };

        Ok(resized)
    }

    fn crop(
        &self,
        img: &DynamicImage,
        width: u32,
        height: u32,
        x: i32,
        y: i32,
    ) -> Result<DynamicImage, TransformError> {
        let (img_w, img_h) = img.dimensions();
        let (left, top, out_w, out_h) = clamp_crop(img_w, img_h, width, height, x, y).ok_or(
            TransformError::OutOfBounds {
                x: x.into(),
                y: y.into(),
                width,
                height,
                image_width: img_w,
                image_height: img_h,
            },
        )?;

        Ok(img.crop_imm(left, top, out_w, out_h))
    }
}

impl Default for ImageTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformEngine for ImageTransformer {
    fn apply(
        &self,
        source: &[u8],
        request: &TransformRequest,
    ) -> Result<TransformedImage, TransformError> {
        let format = detect_format(source)?;

        let img = match request {
            TransformRequest::PassThrough => {
                return Ok(TransformedImage {
                    data: Bytes::copy_from_slice(source),
                    format,
                });
            }
            TransformRequest::Resize {
                mode,
                width,
                height,
            } => {
                let img = self.decode(source)?;
                self.resize(&img, *mode, *width, *height)?
            }
            TransformRequest::Crop {
                width,
                height,
                x,
                y,
            } => {
                let img = self.decode(source)?;
                self.crop(&img, *width, *height, *x, *y)?
            }
        };

        let data = self.encode(&img, format)?;
        Ok(TransformedImage { data, format })
    }
}

// =============================================================================
// Geometry
// =============================================================================

/// Scale `edge` by `target / reference`, rounding, never below one pixel.
fn scale_edge(edge: u32, target: u32, reference: u32) -> u32 {
    let scaled = (edge as f64 * target as f64 / reference as f64).round();
    (scaled as u32).max(1)
}

/// Largest size with the source aspect ratio that fits in `box_w x box_h`.
pub(crate) fn contain_dimensions(
    src_w: u32,
    src_h: u32,
    box_w: u32,
    box_h: u32,
    allow_upscale: bool,
) -> (u32, u32) {
    let mut ratio = f64::min(box_w as f64 / src_w as f64, box_h as f64 / src_h as f64);
    if !allow_upscale {
        ratio = ratio.min(1.0);
    }

    let w = ((src_w as f64 * ratio).round() as u32).max(1);
    let h = ((src_h as f64 * ratio).round() as u32).max(1);
    (w, h)
}

/// Size of the source scaled to cover `box_w x box_h`, before cropping.
pub(crate) fn fill_dimensions(src_w: u32, src_h: u32, box_w: u32, box_h: u32) -> (u64, u64) {
    let ratio = f64::max(box_w as f64 / src_w as f64, box_h as f64 / src_h as f64);
    let w = (src_w as f64 * ratio).round() as u64;
    let h = (src_h as f64 * ratio).round() as u64;
    (w.max(box_w.into()), h.max(box_h.into()))
}

/// Intersect the crop rectangle with the image.
///
/// Returns `(left, top, width, height)` of the intersection, or `None` if it is empty.
pub(crate) fn clamp_crop(
    img_w: u32,
    img_h: u32,
    width: u32,
    height: u32,
    x: i32,
    y: i32,
) -> Option<(u32, u32, u32, u32)> {
    let (x, y) = (i64::from(x), i64::from(y));

    let left = x.max(0);
    let top = y.max(0);
    let right = (x + i64::from(width)).min(i64::from(img_w));
    let bottom = (y + i64::from(height)).min(i64::from(img_h));

    if right <= left || bottom <= top {
        return None;
    }

    Some((
        left as u32,
        top as u32,
        (right - left) as u32,
        (bottom - top) as u32,
    ))
}

// =============================================================================
// Tests
// =============================================================================
