//! Cache effectiveness integration tests.
//!
//! Tests verify:
//! - Each distinct transformation is computed once
//! - Cached entries are served byte-for-byte without revalidation
//! - Key ordering follows the configured policy
//! - Concurrent misses on one key leave a single complete entry

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;

use skinwalker::key::KeyPolicy;
use skinwalker::{
    create_router, FsCacheStore, ImagePipeline, ImageTransformer, LocalImageSource, RouterConfig,
};

use super::test_utils::{create_jpeg, dimensions, get, TestEnv};

// =============================================================================
// Compute Once
// =============================================================================

#[tokio::test]
async fn test_repeated_request_transforms_once() {
    let env = TestEnv::new().with_image("photo.jpg", create_jpeg(300, 200));
    let (router, engine) = env.counting_router();

    let first = get(&router, "/photo.jpg?r=widen&w=100").await;
    for _ in 0..5 {
        let again = get(&router, "/photo.jpg?r=widen&w=100").await;
        assert_eq!(again.status, StatusCode::OK);
        assert!(again.cache_hit());
        assert_eq!(again.body, first.body);
    }

    assert_eq!(engine.calls(), 1);
    assert_eq!(env.cache_entries(), vec!["r=widen&w=100_photo.jpg"]);
}

#[tokio::test]
async fn test_distinct_parameters_get_distinct_entries() {
    let env = TestEnv::new().with_image("photo.jpg", create_jpeg(300, 200));
    let (router, engine) = env.counting_router();

    get(&router, "/photo.jpg?r=widen&w=100").await;
    get(&router, "/photo.jpg?r=widen&w=120").await;
    get(&router, "/photo.jpg?r=heighten&h=100").await;

    assert_eq!(engine.calls(), 3);
    assert_eq!(env.cache_entries().len(), 3);
}

#[tokio::test]
async fn test_existing_entry_is_trusted() {
    let env = TestEnv::new().with_image("photo.jpg", create_jpeg(300, 200));
    let (router, engine) = env.counting_router();

    // An entry placed by an earlier deployment is served as is
    std::fs::write(env.cache_dir.join("r=widen&w=100_photo.jpg"), b"stale bytes").unwrap();

    let response = get(&router, "/photo.jpg?r=widen&w=100").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.cache_hit());
    assert_eq!(response.body.as_ref(), b"stale bytes");
    assert_eq!(response.header("content-type"), "application/octet-stream");
    assert_eq!(engine.calls(), 0);
}

#[tokio::test]
async fn test_failed_transform_is_not_cached() {
    let env = TestEnv::new().with_image("photo.jpg", create_jpeg(50, 50));
    let (router, engine) = env.counting_router();

    for _ in 0..2 {
        let response = get(&router, "/photo.jpg?a=crop&w=10&h=10&x=500&y=500").await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    assert_eq!(engine.calls(), 2);
    assert!(env.cache_entries().is_empty());
}

// =============================================================================
// Key Ordering
// =============================================================================

#[tokio::test]
async fn test_raw_keys_keep_parameter_order() {
    let env = TestEnv::new().with_image("photo.jpg", create_jpeg(300, 200));
    let (router, engine) = env.counting_router();

    let a = get(&router, "/photo.jpg?r=cover&w=100&h=100").await;
    let b = get(&router, "/photo.jpg?h=100&w=100&r=cover").await;

    assert!(!a.cache_hit());
    assert!(!b.cache_hit());
    assert_eq!(engine.calls(), 2);
    assert_eq!(
        env.cache_entries(),
        vec!["h=100&w=100&r=cover_photo.jpg", "r=cover&w=100&h=100_photo.jpg"]
    );
}

#[tokio::test]
async fn test_canonical_keys_share_entry() {
    let env = TestEnv::new().with_image("photo.jpg", create_jpeg(300, 200));
    let pipeline = ImagePipeline::new(
        LocalImageSource::new(&env.source_root).unwrap(),
        FsCacheStore::new(&env.cache_dir),
        ImageTransformer::new(),
    )
    .with_key_policy(KeyPolicy::Canonical);
    let router = create_router(pipeline, RouterConfig::new().with_tracing(false));

    let a = get(&router, "/photo.jpg?r=cover&w=100&h=100").await;
    let b = get(&router, "/photo.jpg?h=100&w=100&r=cover").await;

    assert!(!a.cache_hit());
    assert!(b.cache_hit());
    assert_eq!(a.body, b.body);
    assert_eq!(env.cache_entries(), vec!["h=100&r=cover&w=100_photo.jpg"]);
}

#[tokio::test]
async fn test_long_query_is_hashed() {
    let env = TestEnv::new().with_image("photo.jpg", create_jpeg(60, 40));
    let router = env.router();

    let padding = "p".repeat(300);
    let uri = format!("/photo.jpg?r=widen&w=30&pad={}", padding);

    let first = get(&router, &uri).await;
    let second = get(&router, &uri).await;

    assert_eq!(first.status, StatusCode::OK);
    assert!(second.cache_hit());

    let entries = env.cache_entries();
    assert_eq!(entries.len(), 1);
    // sha256 hex digest, underscore, base name
    assert_eq!(entries[0].len(), 64 + 1 + "photo.jpg".len());
    assert!(entries[0].ends_with("_photo.jpg"));
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_leave_one_complete_entry() {
    let env = TestEnv::new().with_image("photo.jpg", create_jpeg(400, 300));
    let (router, engine) = env.delayed_router(Duration::from_millis(50));
    let router = Arc::new(router);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let router = Arc::clone(&router);
        handles.push(tokio::spawn(async move {
            get(&router, "/photo.jpg?r=cover&w=100&h=100").await
        }));
    }

    let mut bodies = Vec::new();
    for handle in handles {
        let response = handle.await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(dimensions(&response.body), (100, 100));
        bodies.push(response.body);
    }

    // Every racer encodes the same bytes
    assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
    assert!(engine.calls() >= 1);

    assert_eq!(env.cache_entries(), vec!["r=cover&w=100&h=100_photo.jpg"]);
    let cached = std::fs::read(env.cache_dir.join("r=cover&w=100&h=100_photo.jpg")).unwrap();
    assert_eq!(cached.as_slice(), bodies[0].as_ref());

    let after = get(&router, "/photo.jpg?r=cover&w=100&h=100").await;
    assert!(after.cache_hit());
}
