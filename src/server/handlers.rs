//! HTTP request handlers for the image API.
//!
//! # Endpoints
//!
//! - `GET /{path}` - Serve a (possibly transformed) image
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    extract::{Path, RawQuery, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error, warn};

use super::routes::DEFAULT_CACHE_MAX_AGE;
use crate::error::PipelineError;
use crate::pipeline::ImagePipeline;
use crate::source::ImageSource;
use crate::store::CacheStore;
use crate::transform::TransformEngine;

/// Header reporting whether the image came from the cache.
pub static X_CACHE_HIT: HeaderName = HeaderName::from_static("x-cache-hit");

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the image pipeline.
pub struct AppState<S: ImageSource, C: CacheStore, T: TransformEngine> {
    /// The pipeline serving image requests
    pub pipeline: Arc<ImagePipeline<S, C, T>>,

    /// Cache-Control max-age in seconds for successful responses
    pub cache_max_age: u32,

    /// Answer validation failures with 400 instead of 404
    pub bad_request_status: bool,
}

impl<S: ImageSource, C: CacheStore, T: TransformEngine> AppState<S, C, T> {
    /// Create a new application state with the default max-age (1 hour).
    pub fn new(pipeline: ImagePipeline<S, C, T>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            bad_request_status: false,
        }
    }

    /// Set the Cache-Control max-age.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Answer validation failures with 400 instead of 404.
    pub fn with_bad_request_status(mut self, enabled: bool) -> Self {
        self.bad_request_status = enabled;
        self
    }
}

impl<S: ImageSource, C: CacheStore, T: TransformEngine> Clone for AppState<S, C, T> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            cache_max_age: self.cache_max_age,
            bad_request_status: self.bad_request_status,
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// A pipeline failure on its way out of the HTTP layer.
///
/// Every failure becomes an empty-bodied response, 404 by default. The error
/// detail only reaches the logs.
pub struct HandlerError {
    pub error: PipelineError,
    pub status: StatusCode,
}

impl HandlerError {
    /// Collapse an error into the uniform not-found response.
    pub fn not_found(error: PipelineError) -> Self {
        Self {
            error,
            status: StatusCode::NOT_FOUND,
        }
    }

    /// Map validation failures to 400 when `bad_request_status` is set.
    pub fn from_pipeline(error: PipelineError, bad_request_status: bool) -> Self {
        if bad_request_status && error.is_bad_request() {
            Self {
                error,
                status: StatusCode::BAD_REQUEST,
            }
        } else {
            Self::not_found(error)
        }
    }
}

impl From<PipelineError> for HandlerError {
    fn from(error: PipelineError) -> Self {
        Self::not_found(error)
    }
}

/// Logs at a level matching the underlying cause:
/// - server-side failures (cache I/O, encoding) at ERROR
/// - bad input and undecodable sources at WARN
/// - missing images at DEBUG (common and expected)
impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let error_type = self.error.kind();
        let status = self.status.as_u16();

        if self.error.is_server_error() {
            error!(error_type, status, "Server error: {}", self.error);
        } else if error_type == "not_found" {
            debug!(error_type, status, "Resource not found: {}", self.error);
        } else {
            warn!(error_type, status, "Client error: {}", self.error);
        }

        self.status.into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle image requests.
///
/// # Endpoint
///
/// `GET /{path}`
///
/// # Query Parameters
///
/// - `a`: `resize` (default) or `crop`
/// - `r`: `contain`, `widen`, `heighten` or `cover`
/// - `w`, `h`: target dimensions
/// - `x`, `y`: crop origin
///
/// # Response
///
/// - `200 OK`: image bytes in the source format
/// - `404 Not Found`: any failure, empty body
/// - `400 Bad Request`: invalid parameters, only with `bad_request_status`
///
/// # Headers
///
/// - `Content-Type: image/*`
/// - `Cache-Control: public, max-age={cache_max_age}`
/// - `X-Cache-Hit: true|false`
pub async fn image_handler<S, C, T>(
    State(state): State<AppState<S, C, T>>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Response, HandlerError>
where
    S: ImageSource,
    C: CacheStore,
    T: TransformEngine,
{
    let query = query.unwrap_or_default();

    let response = state
        .pipeline
        .handle(&path, &query)
        .await
        .map_err(|e| HandlerError::from_pipeline(e, state.bad_request_status))?;

    debug!(
        path = %path,
        cache_hit = response.cache_hit,
        bytes = response.data.len(),
        "Serving image"
    );

    let headers = [
        (header::CONTENT_TYPE, response.content_type.to_string()),
        (
            header::CACHE_CONTROL,
            format!("public, max-age={}", state.cache_max_age),
        ),
        (X_CACHE_HIT.clone(), response.cache_hit.to_string()),
    ];

    Ok((StatusCode::OK, headers, response.data).into_response())
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
