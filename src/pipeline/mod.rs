//! Request pipeline.
//!
//! Ties the parameter model, key derivation, cache store and transform engine
//! together for one image request.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         ImagePipeline                           │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                      handle()                           │    │
//! │  │  1. Resolve source    4. Hit: read cached bytes         │    │
//! │  │  2. Parse params      5. Miss: read, transform, write   │    │
//! │  │  3. Derive key        6. Return bytes + content type    │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                    │                    │           │
//! │           ▼                    ▼                    ▼           │
//! │    ┌─────────────┐     ┌──────────────┐    ┌─────────────────┐  │
//! │    │ ImageSource │     │  CacheStore  │    │ TransformEngine │  │
//! │    └─────────────┘     └──────────────┘    └─────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All three collaborators are injected, so tests can run the pipeline
//! against in-memory fakes.

mod service;

pub use service::{ImagePipeline, PipelineResponse, FALLBACK_CONTENT_TYPE};
