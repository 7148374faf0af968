//! HTTP server layer for Skinwalker.
//!
//! This module exposes the image pipeline over HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                          │
//! │               GET /{path}?a=..&r=..&w=..&h=..               │
//! │                                                             │
//! │  ┌───────────────────────────┐  ┌────────────────────────┐  │
//! │  │         handlers          │  │         routes         │  │
//! │  │ (requests, error mapping) │  │ (router config, CORS)  │  │
//! │  └───────────────────────────┘  └────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{health_handler, image_handler, AppState, HandlerError, HealthResponse};
pub use routes::{create_router, RouterConfig};
