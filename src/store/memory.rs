//! In-memory cache store.
//!
//! An LRU of encoded images bounded by total byte size. Useful for embedding
//! the pipeline without a writable directory and as a fake in tests.
//!
//! # Size-Based Eviction
//!
//! The store tracks the total size of cached entries in bytes and evicts
//! least-recently-used entries when the capacity is exceeded. Unlike the
//! filesystem store, entries can therefore disappear; a later request simply
//! misses and recomputes.

use std::num::NonZeroUsize;

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use tokio::sync::Mutex;

use super::CacheStore;
use crate::error::IoError;
use crate::key::CacheKey;

/// Default capacity: 100MB
pub const DEFAULT_MEMORY_CACHE_CAPACITY: usize = 100 * 1024 * 1024;

/// Default maximum number of entries (to bound LRU overhead)
const DEFAULT_MAX_ENTRIES: usize = 10_000;

struct Inner {
    entries: LruCache<CacheKey, Bytes>,
    current_size: usize,
}

/// Size-bounded LRU [`CacheStore`].
///
/// # Example
///
/// ```
/// use skinwalker::key::CacheKey;
/// use skinwalker::store::{CacheStore, MemoryCacheStore};
/// use bytes::Bytes;
///
/// #[tokio::main]
/// async fn main() {
///     let store = MemoryCacheStore::new();
///     let key = CacheKey::from_file_name("r=widen&w=10_photo.jpg").unwrap();
///
///     store.write(&key, Bytes::from_static(b"jpeg")).await.unwrap();
///     assert!(store.exists(&key).await);
/// }
/// ```
pub struct MemoryCacheStore {
    inner: Mutex<Inner>,
    max_size: usize,
}

impl MemoryCacheStore {
    /// Create a store with default capacity (100MB).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_CACHE_CAPACITY)
    }

    /// Create a store holding at most `max_size` bytes.
    pub fn with_capacity(max_size: usize) -> Self {
        Self::with_capacity_and_entries(max_size, DEFAULT_MAX_ENTRIES)
    }

    /// Create a store with a byte capacity and a maximum entry count.
    ///
    /// An entry count of zero is treated as one.
    pub fn with_capacity_and_entries(max_size: usize, max_entries: usize) -> Self {
        let max_entries = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(max_entries),
                current_size: 0,
            }),
            max_size,
        }
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.entries.is_empty()
    }

    /// Total size of cached entries in bytes.
    pub async fn size(&self) -> usize {
        self.inner.lock().await.current_size
    }

    /// Maximum capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.max_size
    }

    /// Remove every entry.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.entries.clear();
        inner.current_size = 0;
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn exists(&self, key: &CacheKey) -> bool {
        self.inner.lock().await.entries.contains(key)
    }

    async fn read(&self, key: &CacheKey) -> Result<Bytes, IoError> {
        let mut inner = self.inner.lock().await;
        inner
            .entries
            .get(key)
            .cloned()
            .ok_or_else(|| IoError::NotFound(key.to_string()))
    }

    async fn write(&self, key: &CacheKey, data: Bytes) -> Result<(), IoError> {
        let data_size = data.len();
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        if let Some(old) = inner.entries.peek(key) {
            inner.current_size = inner.current_size.saturating_sub(old.len());
        }

        // Entry-count eviction happens inside push
        if let Some((evicted_key, evicted)) = inner.entries.push(key.clone(), data) {
            if &evicted_key != key {
                inner.current_size = inner.current_size.saturating_sub(evicted.len());
            }
        }
        inner.current_size += data_size;

        while inner.current_size > self.max_size {
            match inner.entries.pop_lru() {
                Some((_, evicted)) => {
                    inner.current_size = inner.current_size.saturating_sub(evicted.len());
                }
                None => break,
            }
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
