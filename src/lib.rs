//! # Skinwalker
//!
//! An HTTP image transform service with a disk cache.
//!
//! A request names a source image by its path and describes a transformation
//! in the query string. The first request for a given image and parameter
//! combination decodes, transforms and re-encodes the image and stores the
//! result under a key derived from the request; every later identical request
//! is answered from the cache without decoding anything.
//!
//! ## Features
//!
//! - **Resize modes**: `widen`, `heighten`, `contain` and `cover`
//! - **Cropping**: fixed-size rectangles, clamped to the image bounds
//! - **Format preservation**: output keeps the source format
//! - **Atomic cache writes**: concurrent misses never expose a partial entry
//! - **Confined paths**: requests cannot leave the source root or the cache directory
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`params`] - Query parsing and transform request validation
//! - [`key`] - Cache key derivation
//! - [`transform`] - Decoding, resizing, cropping and encoding
//! - [`store`] - Cache stores (filesystem and in-memory)
//! - [`source`] - Source image resolution
//! - [`pipeline`] - Cache lookup and transform orchestration
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use skinwalker::{create_router, FsCacheStore, ImagePipeline, ImageTransformer, LocalImageSource, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = ImagePipeline::new(
//!         LocalImageSource::new("/var/www/uploads")?,
//!         FsCacheStore::new("/var/cache/skinwalker"),
//!         ImageTransformer::new(),
//!     );
//!
//!     let router = create_router(pipeline, RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod key;
pub mod params;
pub mod pipeline;
pub mod server;
pub mod source;
pub mod store;
pub mod transform;

// Re-export commonly used types
pub use config::{CheckConfig, Cli, Command, ServeConfig};
pub use error::{
    IoError, KeyError, PipelineError, SourceError, TransformError, ValidationError,
};
pub use key::{derive_key, CacheKey, KeyPolicy, MAX_KEY_LEN};
pub use params::{parse_query, ResizeMode, TransformRequest};
pub use pipeline::{ImagePipeline, PipelineResponse};
pub use server::{
    create_router, health_handler, image_handler, AppState, HandlerError, HealthResponse,
    RouterConfig,
};
pub use source::{ImageSource, LocalImageSource, SourceImage};
pub use store::{CacheStats, CacheStore, FsCacheStore, MemoryCacheStore};
pub use transform::{
    detect_format, ImageTransformer, TransformEngine, TransformedImage, DEFAULT_JPEG_QUALITY,
};
