//! Transform engine.
//!
//! Applies one geometric operation to a source image and re-encodes the result
//! in the source's own format.
//!
//! ```text
//! source bytes ──► sniff format ──► decode ──► resize / crop ──► encode ──► bytes
//!                       │
//!                       └── pass-through: bytes returned unchanged
//! ```
//!
//! # Components
//!
//! - [`TransformEngine`]: the seam the pipeline calls, so tests can substitute fakes
//! - [`ImageTransformer`]: the production engine backed by the `image` crate
//! - [`TransformedImage`]: encoded output plus its format

mod engine;

pub use engine::{
    ImageTransformer, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_OUTPUT_PIXELS, MAX_JPEG_QUALITY,
    MIN_JPEG_QUALITY,
};

use bytes::Bytes;
use image::ImageFormat;

use crate::error::TransformError;
use crate::params::TransformRequest;

/// Encoded output of a transform.
#[derive(Debug, Clone)]
pub struct TransformedImage {
    /// Encoded image bytes
    pub data: Bytes,

    /// Format the bytes are encoded in (always the source format)
    pub format: ImageFormat,
}

impl TransformedImage {
    /// MIME type for the `Content-Type` header.
    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

/// Applies a [`TransformRequest`] to encoded source bytes.
///
/// Implementations are CPU-bound and synchronous; the pipeline runs them on the
/// blocking thread pool.
pub trait TransformEngine: Send + Sync + 'static {
    /// Transform `source` according to `request`.
    ///
    /// # Errors
    ///
    /// - [`TransformError::DecodeError`] if the source cannot be decoded
    /// - [`TransformError::OutOfBounds`] if a crop misses the image entirely
    /// - [`TransformError::TooLarge`] if a resize would exceed the pixel budget
    /// - [`TransformError::EncodeError`] if the result cannot be re-encoded
    fn apply(
        &self,
        source: &[u8],
        request: &TransformRequest,
    ) -> Result<TransformedImage, TransformError>;
}

/// Sniff the image format from leading magic bytes.
pub fn detect_format(data: &[u8]) -> Result<ImageFormat, TransformError> {
    image::guess_format(data).map_err(|e| TransformError::DecodeError {
        message: e.to_string(),
    })
}
