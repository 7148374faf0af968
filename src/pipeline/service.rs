//! Image pipeline orchestration.
//!
//! No lock is held across decode, transform and write. Two requests that miss
//! on the same key may both compute; the cache store's atomic writes make
//! that harmless.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::error::PipelineError;
use crate::key::{derive_key, KeyPolicy};
use crate::params::{parse_query, TransformRequest};
use crate::source::ImageSource;
use crate::store::CacheStore;
use crate::transform::{detect_format, TransformEngine};

/// Content type used when cached bytes do not match a known image format.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

// =============================================================================
// Pipeline Response
// =============================================================================

/// Response from the image pipeline.
#[derive(Debug, Clone)]
pub struct PipelineResponse {
    /// Encoded image bytes
    pub data: Bytes,

    /// MIME type of `data`
    pub content_type: &'static str,

    /// Whether the bytes came from the cache
    pub cache_hit: bool,
}

// =============================================================================
// Image Pipeline
// =============================================================================

/// Serves transformed images, computing each distinct transformation once.
///
/// # Type Parameters
///
/// * `S` - where source images come from
/// * `C` - where transformed images are cached
/// * `T` - the transform engine
///
/// # Example
///
/// ```ignore
/// use skinwalker::pipeline::ImagePipeline;
/// use skinwalker::source::LocalImageSource;
/// use skinwalker::store::FsCacheStore;
/// use skinwalker::transform::ImageTransformer;
///
/// let pipeline = ImagePipeline::new(
///     LocalImageSource::new("/var/www/uploads")?,
///     FsCacheStore::new("/var/cache/skinwalker"),
///     ImageTransformer::new(),
/// );
///
/// let response = pipeline.handle("2024/photo.jpg", "r=cover&w=100&h=100").await?;
/// println!("{} bytes, cache hit: {}", response.data.len(), response.cache_hit);
/// ```
pub struct ImagePipeline<S: ImageSource, C: CacheStore, T: TransformEngine> {
    source: Arc<S>,
    store: Arc<C>,
    engine: Arc<T>,
    key_policy: KeyPolicy,
}

impl<S: ImageSource, C: CacheStore, T: TransformEngine> ImagePipeline<S, C, T> {
    /// Create a pipeline with raw (order-preserving) cache keys.
    pub fn new(source: S, store: C, engine: T) -> Self {
        Self::with_shared(Arc::new(source), Arc::new(store), Arc::new(engine))
    }

    /// Create a pipeline from shared collaborators.
    ///
    /// Lets tests keep a handle on the store or engine they inject.
    pub fn with_shared(source: Arc<S>, store: Arc<C>, engine: Arc<T>) -> Self {
        Self {
            source,
            store,
            engine,
            key_policy: KeyPolicy::Raw,
        }
    }

    /// Set the parameter ordering policy for cache keys.
    pub fn with_key_policy(mut self, policy: KeyPolicy) -> Self {
        self.key_policy = policy;
        self
    }

    /// The cache store.
    pub fn store(&self) -> &Arc<C> {
        &self.store
    }

    /// Serve `logical_path` transformed according to `raw_query`.
    ///
    /// An existing cache entry is returned as is, without decoding or
    /// validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The source is missing or outside the permitted root
    /// - The query parameters are invalid
    /// - The source cannot be decoded or the transform fails
    /// - The cache entry cannot be read or written
    pub async fn handle(
        &self,
        logical_path: &str,
        raw_query: &str,
    ) -> Result<PipelineResponse, PipelineError> {
        let image = self.source.resolve(logical_path).await?;

        let pairs = parse_query(raw_query);
        let request = TransformRequest::parse(&pairs)?;

        let key = derive_key(image.name(), &pairs, self.key_policy)?;

        if self.store.exists(&key).await {
            let data = self.store.read(&key).await?;
            debug!(key = %key, bytes = data.len(), "Cache hit");

            let content_type = detect_format(&data)
                .map(|format| format.to_mime_type())
                .unwrap_or(FALLBACK_CONTENT_TYPE);

            return Ok(PipelineResponse {
                data,
                content_type,
                cache_hit: true,
            });
        }

        debug!(key = %key, request = ?request, "Cache miss");

        let source_bytes = self.source.read(&image).await?;

        let engine = Arc::clone(&self.engine);
        let transformed =
            tokio::task::spawn_blocking(move || engine.apply(&source_bytes, &request))
                .await
                .map_err(|e| PipelineError::Task(e.to_string()))??;

        self.store.write(&key, transformed.data.clone()).await?;

        Ok(PipelineResponse {
            content_type: transformed.content_type(),
            data: transformed.data,
            cache_hit: false,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
