//! Source images on the local filesystem.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::{ImageSource, SourceImage};
use crate::error::{IoError, SourceError};

/// Serves images from a directory tree.
///
/// Request paths are confined to the root: `..`, absolute paths and symlinks
/// that lead outside it are rejected.
#[derive(Debug, Clone)]
pub struct LocalImageSource {
    root: PathBuf,
}

impl LocalImageSource {
    /// Create a source rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NotFound`] if the root does not exist.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SourceError> {
        let root = root.as_ref();
        let root = std::fs::canonicalize(root)
            .map_err(|_| SourceError::NotFound(root.display().to_string()))?;
        Ok(Self { root })
    }

    /// Canonical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Check that `relative` only descends from the root.
fn check_relative(relative: &str) -> Result<&Path, SourceError> {
    if relative.contains(['\\', '\0']) {
        return Err(SourceError::OutsideRoot(relative.to_string()));
    }

    let path = Path::new(relative);
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(SourceError::OutsideRoot(relative.to_string())),
        }
    }
    Ok(path)
}

#[async_trait]
impl ImageSource for LocalImageSource {
    async fn resolve(&self, logical_path: &str) -> Result<SourceImage, SourceError> {
        let relative = logical_path.trim_start_matches('/');
        if relative.is_empty() {
            return Err(SourceError::NotFound(logical_path.to_string()));
        }

        let candidate = self.root.join(check_relative(relative)?);

        let canonical = tokio::fs::canonicalize(&candidate)
            .await
            .map_err(|_| SourceError::NotFound(logical_path.to_string()))?;

        if !canonical.starts_with(&self.root) {
            return Err(SourceError::OutsideRoot(logical_path.to_string()));
        }

        let is_file = tokio::fs::metadata(&canonical)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(SourceError::NotFound(logical_path.to_string()));
        }

        debug!(path = %canonical.display(), "Resolved source image");

        Ok(SourceImage {
            logical_path: relative.to_string(),
            path: canonical,
        })
    }

    async fn read(&self, image: &SourceImage) -> Result<Bytes, SourceError> {
        match tokio::fs::read(&image.path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SourceError::NotFound(image.logical_path.clone()))
            }
            Err(e) => Err(IoError::Read {
                path: image.path.display().to_string(),
                message: e.to_string(),
            }
            .into()),
        }
    }
}
