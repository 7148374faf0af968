//! Cache store layer.
//!
//! Persists transformed images keyed by [`CacheKey`]. An entry that exists is
//! trusted as complete and correct: there is no index, manifest or checksum,
//! and entries are never modified after they are written.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               ImagePipeline                 │
//! └──────────────────────┬──────────────────────┘
//!                        │ exists / read / write
//!                        ▼
//! ┌─────────────────────────────────────────────┐
//! │              CacheStore Trait               │
//! └──────────────────────┬──────────────────────┘
//!            ┌───────────┴───────────┐
//!            ▼                       ▼
//! ┌────────────────────┐  ┌─────────────────────┐
//! │   FsCacheStore     │  │  MemoryCacheStore   │
//! │  (one file/key,    │  │ (size-bounded LRU)  │
//! │   atomic rename)   │  │                     │
//! └────────────────────┘  └─────────────────────┘
//! ```
//!
//! # Concurrency
//!
//! Two requests that miss on the same key may both compute and both write.
//! Writes must be atomic so a reader sees either no entry or the whole entry;
//! the last writer wins and both writers produce the same bytes.

mod fs;
mod memory;

pub use fs::{CacheStats, FsCacheStore, TEMP_FILE_PREFIX};
pub use memory::{MemoryCacheStore, DEFAULT_MEMORY_CACHE_CAPACITY};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::IoError;
use crate::key::CacheKey;

/// Storage for transformed images.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Whether a complete entry exists for `key`.
    async fn exists(&self, key: &CacheKey) -> bool;

    /// Read the entry for `key`.
    async fn read(&self, key: &CacheKey) -> Result<Bytes, IoError>;

    /// Store `data` under `key`.
    ///
    /// Must never expose a partially written entry to `exists` or `read`.
    async fn write(&self, key: &CacheKey, data: Bytes) -> Result<(), IoError>;
}
