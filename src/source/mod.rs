//! Source image access.
//!
//! Maps the logical path of a request onto a readable image. Source images are
//! owned by the filesystem; this layer only reads them.
//!
//! # Usage
//!
//! ```ignore
//! use skinwalker::source::{ImageSource, LocalImageSource};
//!
//! let source = LocalImageSource::new("/var/www/uploads")?;
//!
//! // Resolve a request path (rejects anything outside the root)
//! let image = source.resolve("2024/05/photo.jpg").await?;
//!
//! // Read the encoded bytes
//! let bytes = source.read(&image).await?;
//! ```

mod local;

pub use local::LocalImageSource;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::SourceError;

/// A resolved source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    /// Path as requested, relative to the source root
    pub logical_path: String,

    /// Location the bytes are read from
    pub path: PathBuf,
}

impl SourceImage {
    /// Base name of the requested file, used in the cache key.
    pub fn name(&self) -> &Path {
        Path::new(&self.logical_path)
    }
}

/// Resolves and reads source images.
#[async_trait]
pub trait ImageSource: Send + Sync + 'static {
    /// Resolve a logical request path.
    ///
    /// # Errors
    ///
    /// - [`SourceError::OutsideRoot`] if the path escapes the permitted root
    /// - [`SourceError::NotFound`] if no file exists there
    async fn resolve(&self, logical_path: &str) -> Result<SourceImage, SourceError>;

    /// Read the encoded bytes of a resolved image.
    async fn read(&self, image: &SourceImage) -> Result<Bytes, SourceError>;
}
