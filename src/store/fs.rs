//! Filesystem cache store.
//!
//! Layout: `{cache_dir}/{key}`, one file per entry, nothing else.
//!
//! Writes go to a uniquely named temp file in the same directory and are then
//! renamed over the final path. Rename within one directory is atomic, so a
//! concurrent `exists` either misses or sees the complete file.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::Builder;
use tracing::debug;

use super::CacheStore;
use crate::error::IoError;
use crate::key::CacheKey;

/// Prefix of in-flight temp files inside the cache directory.
pub const TEMP_FILE_PREFIX: &str = ".skinwalker-";

/// Entry count and total size of a cache directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache entries
    pub entries: usize,

    /// Sum of entry sizes in bytes
    pub total_bytes: u64,
}

/// Cache store backed by a directory.
///
/// The directory must already exist; creating it is a deployment concern.
#[derive(Debug, Clone)]
pub struct FsCacheStore {
    cache_dir: PathBuf,
}

impl FsCacheStore {
    /// Create a store rooted at `cache_dir`.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Root directory of the store.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Filesystem path of the entry for `key`.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(key)
    }

    /// Count entries and sum their sizes, skipping in-flight temp files.
    pub async fn stats(&self) -> Result<CacheStats, IoError> {
        let dir_name = self.cache_dir.display().to_string();
        let read_err = |e: std::io::Error| IoError::Read {
            path: dir_name.clone(),
            message: e.to_string(),
        };

        let mut stats = CacheStats::default();
        let mut entries = tokio::fs::read_dir(&self.cache_dir)
            .await
            .map_err(read_err)?;

        while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
            if entry.file_name().to_string_lossy().starts_with(TEMP_FILE_PREFIX) {
                continue;
            }
            let metadata = entry.metadata().await.map_err(read_err)?;
            if metadata.is_file() {
                stats.entries += 1;
                stats.total_bytes += metadata.len();
            }
        }

        Ok(stats)
    }
}

#[async_trait]
impl CacheStore for FsCacheStore {
    async fn exists(&self, key: &CacheKey) -> bool {
        tokio::fs::metadata(self.path_for(key))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    async fn read(&self, key: &CacheKey) -> Result<Bytes, IoError> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(IoError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(IoError::Read {
                path: path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }

    async fn write(&self, key: &CacheKey, data: Bytes) -> Result<(), IoError> {
        let dir = self.cache_dir.clone();
        let path = self.path_for(key);

        let written = tokio::task::spawn_blocking(move || write_atomic(&dir, &path, &data))
            .await
            .map_err(|e| IoError::Write {
                path: key.to_string(),
                message: e.to_string(),
            })?;

        if written.is_ok() {
            debug!(key = %key, "Cache entry written");
        }
        written
    }
}

/// Write `data` to a temp file in `dir` and rename it onto `path`.
fn write_atomic(dir: &Path, path: &Path, data: &[u8]) -> Result<(), IoError> {
    let write_err = |e: std::io::Error| IoError::Write {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let mut tmp = Builder::new()
        .prefix(TEMP_FILE_PREFIX)
        .tempfile_in(dir)
        .map_err(write_err)?;

    tmp.write_all(data).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;

    // On failure the temp file is dropped and removed
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
