//! Path confinement integration tests.
//!
//! Tests verify:
//! - Request paths cannot leave the source root
//! - Hostile query values cannot place cache entries outside the cache directory

use std::path::PathBuf;

use axum::http::StatusCode;

use super::test_utils::{create_jpeg, get, TestEnv};

/// Write a file next to the source root that must never be served.
fn plant_secret(env: &TestEnv) {
    std::fs::write(env.base_dir().join("secret.jpg"), create_jpeg(10, 10)).unwrap();
}

#[tokio::test]
async fn test_parent_traversal_in_path() {
    let env = TestEnv::new();
    plant_secret(&env);
    let router = env.router();

    for uri in [
        "/../secret.jpg",
        "/../secret.jpg?r=widen&w=5",
        "/%2e%2e/secret.jpg",
        "/a/../../secret.jpg",
        "/..%2fsecret.jpg",
        "/..%5csecret.jpg",
    ] {
        let response = get(&router, uri).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{}", uri);
        assert!(response.body.is_empty(), "{}", uri);
    }

    assert!(env.cache_entries().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_out_of_root() {
    let env = TestEnv::new();
    plant_secret(&env);
    std::os::unix::fs::symlink(
        env.base_dir().join("secret.jpg"),
        env.source_root.join("link.jpg"),
    )
    .unwrap();
    let router = env.router();

    let response = get(&router, "/link.jpg?r=widen&w=5").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_traversal_in_query_stays_in_cache_dir() {
    let env = TestEnv::new().with_image("photo.jpg", create_jpeg(40, 40));
    let router = env.router();
    let before = env.all_files();

    for uri in [
        "/photo.jpg?r=widen&w=20&x=../../escaped",
        "/photo.jpg?r=widen&w=20&..%2F..%2Fescaped=1",
        "/photo.jpg?r=widen&w=20&z=..%5C..%5Cescaped",
        "/photo.jpg?r=widen&w=20&n=%00",
    ] {
        let response = get(&router, uri).await;
        assert_eq!(response.status, StatusCode::OK, "{}", uri);
    }

    let new_files: Vec<PathBuf> = env
        .all_files()
        .into_iter()
        .filter(|path| !before.contains(path))
        .collect();

    assert_eq!(new_files.len(), 4);
    for path in &new_files {
        assert!(path.starts_with("cache"), "{} escaped", path.display());
        assert_eq!(path.components().count(), 2, "{}", path.display());
    }
}
