//! Test utilities for integration tests.
//!
//! Provides fixture images, a throwaway source/cache directory pair, and
//! wrappers that count transforms or slow down cache writes.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;
use tower::ServiceExt;

use skinwalker::error::{IoError, TransformError};
use skinwalker::key::CacheKey;
use skinwalker::store::{CacheStore, FsCacheStore};
use skinwalker::transform::{ImageTransformer, TransformEngine, TransformedImage};
use skinwalker::{create_router, ImagePipeline, LocalImageSource, RouterConfig, TransformRequest};

// =============================================================================
// Fixture Images
// =============================================================================

fn gradient(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    DynamicImage::ImageRgb8(img)
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

/// Create a JPEG with a gradient pattern.
pub fn create_jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient(width, height), ImageFormat::Jpeg)
}

/// Create a PNG with a gradient pattern.
pub fn create_png(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient(width, height), ImageFormat::Png)
}

/// Create an image with a gradient pattern in any encodable format.
pub fn create_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    encode(&gradient(width, height), format)
}

/// Decode `data` and return its dimensions.
pub fn dimensions(data: &[u8]) -> (u32, u32) {
    image::load_from_memory(data).unwrap().dimensions()
}

/// Sniff the format of encoded bytes.
pub fn format_of(data: &[u8]) -> ImageFormat {
    image::guess_format(data).unwrap()
}

// =============================================================================
// Test Environment
// =============================================================================

/// A source root and an empty cache directory inside one temp directory.
pub struct TestEnv {
    _dir: TempDir,
    pub source_root: PathBuf,
    pub cache_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let source_root = dir.path().join("uploads");
        let cache_dir = dir.path().join("cache");
        std::fs::create_dir(&source_root).unwrap();
        std::fs::create_dir(&cache_dir).unwrap();

        Self {
            _dir: dir,
            source_root,
            cache_dir,
        }
    }

    /// Add a source image, creating parent directories as needed.
    pub fn with_image(self, relative: &str, data: Vec<u8>) -> Self {
        let path = self.source_root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, data).unwrap();
        self
    }

    /// Directory that contains both the source root and the cache directory.
    pub fn base_dir(&self) -> &Path {
        self._dir.path()
    }

    /// Names of the files in the cache directory, sorted.
    pub fn cache_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.cache_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Every file anywhere under the base directory, relative to it.
    pub fn all_files(&self) -> Vec<PathBuf> {
        fn walk(dir: &Path, base: &Path, out: &mut Vec<PathBuf>) {
            for entry in std::fs::read_dir(dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    walk(&path, base, out);
                } else {
                    out.push(path.strip_prefix(base).unwrap().to_path_buf());
                }
            }
        }

        let mut out = Vec::new();
        walk(self.base_dir(), self.base_dir(), &mut out);
        out.sort();
        out
    }

    /// Router over this environment with the default engine.
    pub fn router(&self) -> Router {
        self.router_with(RouterConfig::new().with_tracing(false))
    }

    /// Router over this environment with a custom router configuration.
    pub fn router_with(&self, config: RouterConfig) -> Router {
        let pipeline = ImagePipeline::new(
            LocalImageSource::new(&self.source_root).unwrap(),
            FsCacheStore::new(&self.cache_dir),
            ImageTransformer::new(),
        );
        create_router(pipeline, config)
    }

    /// Router whose engine counts transform invocations.
    pub fn counting_router(&self) -> (Router, Arc<CountingTransformer>) {
        let engine = Arc::new(CountingTransformer::default());
        let pipeline = ImagePipeline::with_shared(
            Arc::new(LocalImageSource::new(&self.source_root).unwrap()),
            Arc::new(FsCacheStore::new(&self.cache_dir)),
            Arc::clone(&engine),
        );
        (
            create_router(pipeline, RouterConfig::new().with_tracing(false)),
            engine,
        )
    }

    /// Router whose cache writes are delayed, widening the miss window.
    pub fn delayed_router(&self, delay: Duration) -> (Router, Arc<CountingTransformer>) {
        let engine = Arc::new(CountingTransformer::default());
        let pipeline = ImagePipeline::with_shared(
            Arc::new(LocalImageSource::new(&self.source_root).unwrap()),
            Arc::new(DelayedStore::new(FsCacheStore::new(&self.cache_dir), delay)),
            Arc::clone(&engine),
        );
        (
            create_router(pipeline, RouterConfig::new().with_tracing(false)),
            engine,
        )
    }
}

// =============================================================================
// Engine and Store Wrappers
// =============================================================================

/// Transform engine that counts how often it runs.
#[derive(Default)]
pub struct CountingTransformer {
    inner: ImageTransformer,
    calls: AtomicUsize,
}

impl CountingTransformer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TransformEngine for CountingTransformer {
    fn apply(
        &self,
        source: &[u8],
        request: &TransformRequest,
    ) -> Result<TransformedImage, TransformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.apply(source, request)
    }
}

/// Cache store that sleeps before every write.
pub struct DelayedStore<C> {
    inner: C,
    delay: Duration,
}

impl<C> DelayedStore<C> {
    pub fn new(inner: C, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl<C: CacheStore> CacheStore for DelayedStore<C> {
    async fn exists(&self, key: &CacheKey) -> bool {
        self.inner.exists(key).await
    }

    async fn read(&self, key: &CacheKey) -> Result<Bytes, IoError> {
        self.inner.read(key).await
    }

    async fn write(&self, key: &CacheKey, data: Bytes) -> Result<(), IoError> {
        tokio::time::sleep(self.delay).await;
        self.inner.write(key, data).await
    }
}

// =============================================================================
// Request Helpers
// =============================================================================

/// A collected response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> &str {
        self.headers.get(name).unwrap().to_str().unwrap()
    }

    pub fn cache_hit(&self) -> bool {
        self.header("x-cache-hit") == "true"
    }
}

/// Send a GET request through the router and collect the response.
pub async fn get(router: &Router, uri: &str) -> TestResponse {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();

    TestResponse {
        status,
        headers,
        body,
    }
}
