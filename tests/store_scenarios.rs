//! Controller and store scenarios
//!
//! End-to-end behaviour through the public API: cacheability gating, TTL,
//! LRU overwrite semantics and invalidation on both store kinds.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::InProcessBackend;
use response_cache::cache::{
    BoundedMemoryStore, KvBackend, ManualClock, MemoryStoreConfig, PathMatcher, RemoteStore,
    RemoteStoreConfig, Store,
};
use response_cache::controller::generate_key;
use response_cache::models::{Metadata, RequestSnapshot, ResponseSnapshot};
use response_cache::{CachePolicy, Controller, InvalidationPolicy};

const START_MS: u64 = 1_700_000_000_000;

// == Helper Functions ==

fn clocked_store(max_size: usize) -> (BoundedMemoryStore, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(START_MS));
    let store =
        BoundedMemoryStore::with_clock(MemoryStoreConfig::new(max_size), clock.clone()).unwrap();
    (store, clock)
}

fn ok(body: &str) -> ResponseSnapshot {
    ResponseSnapshot::new(200, body).with_header("Content-Type", "text/plain")
}

// == Cacheability ==

#[tokio::test]
async fn test_cacheability_gating() {
    let controller = Controller::new();
    let policy = CachePolicy::new(60).unwrap();

    let get = RequestSnapshot::new("GET", "/reports");
    assert!(controller.is_cachable_request(&get, Some(&policy)));
    assert!(controller.is_cachable_response(&ok("report")));

    let private = ok("secret").with_header("Cache-Control", "private");
    assert!(!controller.is_cachable_response(&private));
    let private_301 = ResponseSnapshot::new(301, "").with_header("Cache-Control", "private");
    assert!(!controller.is_cachable_response(&private_301));

    let post = RequestSnapshot::new("POST", "/reports");
    assert!(!controller.is_cachable_request(&post, Some(&policy)));
}

// == TTL ==

#[tokio::test]
async fn test_ttl_scenario() {
    let controller = Controller::new();
    let (store, clock) = clocked_store(100);
    let request = RequestSnapshot::new("GET", "/k1");

    controller
        .cache_response("k1", &request, &ok("v1"), &store, Some(60))
        .await;

    clock.advance(Duration::from_secs(30));
    assert!(controller.get_cached_response("k1", &store).await.is_some());

    clock.advance(Duration::from_secs(31));
    assert!(controller.get_cached_response("k1", &store).await.is_none());
    assert_eq!(store.stats().await.expirations, 1);
}

#[tokio::test]
async fn test_store_default_ttl_applies_without_record_ttl() {
    let clock = Arc::new(ManualClock::new(START_MS));
    let store =
        BoundedMemoryStore::with_clock(MemoryStoreConfig::new(10).with_ttl(5), clock.clone())
            .unwrap();
    let controller = Controller::new();
    let request = RequestSnapshot::new("GET", "/short");

    controller
        .cache_response("short", &request, &ok("x"), &store, None)
        .await;
    clock.advance(Duration::from_secs(5));
    assert!(controller.get_cached_response("short", &store).await.is_some());

    clock.advance(Duration::from_millis(1));
    assert!(controller.get_cached_response("short", &store).await.is_none());
}

// == LRU ==

#[tokio::test]
async fn test_overwrite_replaces_metadata_and_refreshes_recency() {
    // max_size 20: batch of 2, eviction once past 21 records
    let (store, _) = clocked_store(20);
    let request = RequestSnapshot::new("GET", "/");

    let mut first = Metadata::with_ttl(Some(300));
    first.etag = Some("\"a\"".to_string());
    first
        .extra
        .insert("origin".to_string(), serde_json::json!("first"));
    store
        .store("k0", ok("old"), request.clone(), first)
        .await
        .unwrap();
    for i in 1..20 {
        store
            .store(&format!("k{i}"), ok("v"), request.clone(), Metadata::default())
            .await
            .unwrap();
    }

    store
        .store("k0", ok("new"), request.clone(), Metadata::default())
        .await
        .unwrap();
    for i in 20..22 {
        store
            .store(&format!("k{i}"), ok("v"), request.clone(), Metadata::default())
            .await
            .unwrap();
    }

    assert_eq!(store.len().await, 20);
    assert!(!store.contains("k1").await);
    assert!(!store.contains("k2").await);

    let record = store.retrieve("k0").await.unwrap().unwrap();
    assert_eq!(record.response.body, b"new");
    assert_eq!(record.metadata.ttl, None);
    assert_eq!(record.metadata.etag, None);
    assert!(record.metadata.extra.is_empty());
    assert!(record.metadata.write_time.is_some());
}

// == Invalidation ==

#[tokio::test]
async fn test_pattern_invalidation_isolation() {
    let controller = Controller::new();
    let (store, _) = clocked_store(100);
    let policy = CachePolicy::new(60).unwrap();

    for path in ["/api/users", "/api/posts", "/admin"] {
        let request = RequestSnapshot::new("GET", path);
        let key = controller.generate_cache_key(&request, &policy);
        controller
            .cache_response(&key, &request, &ok(path), &store, Some(60))
            .await;
    }

    let invalidation = InvalidationPolicy::new(vec![PathMatcher::regex("^/api/.*").unwrap()]);
    controller.invalidate(&invalidation, &store).await;

    assert_eq!(store.len().await, 1);
    let admin = generate_key(&RequestSnapshot::new("GET", "/admin"));
    let cached = controller.get_cached_response(&admin, &store).await.unwrap();
    assert_eq!(cached.body, b"/admin");
}

#[tokio::test]
async fn test_template_invalidation_matches_segments() {
    let controller = Controller::new();
    let (store, _) = clocked_store(100);

    for (key, path) in [("a", "/users/1/posts"), ("b", "/users/2"), ("c", "/teams/1")] {
        controller
            .cache_response(key, &RequestSnapshot::new("GET", path), &ok(path), &store, None)
            .await;
    }

    let invalidation = InvalidationPolicy::from_templates(&["/users/{id}"]).unwrap();
    controller.invalidate(&invalidation, &store).await;

    assert!(!store.contains("a").await);
    assert!(!store.contains("b").await);
    assert!(store.contains("c").await);
}

// == Remote Store ==

#[tokio::test]
async fn test_remote_store_through_controller() {
    let backend = Arc::new(InProcessBackend::default());
    let store = RemoteStore::new(backend.clone(), RemoteStoreConfig::default()).unwrap();
    let controller = Controller::new();
    // Path-shaped keys so that glob invalidation can select them
    let policy = CachePolicy::new(120)
        .unwrap()
        .with_key_func(|r: &RequestSnapshot| r.path_and_query());

    for path in ["/api/users", "/api/posts", "/admin"] {
        let request = RequestSnapshot::new("GET", path);
        let key = controller.generate_cache_key(&request, &policy);
        controller
            .cache_response(&key, &request, &ok(path), &store, Some(policy.max_age))
            .await;
    }
    assert_eq!(backend.expiry("cache:/admin"), Some(120));

    let cached = controller.get_cached_response("/api/users", &store).await.unwrap();
    assert_eq!(cached, ok("/api/users"));

    let invalidation = InvalidationPolicy::new(vec![PathMatcher::regex("^/api/.*").unwrap()]);
    controller.invalidate(&invalidation, &store).await;
    assert_eq!(backend.keys(), vec!["cache:/admin".to_string()]);

    store.close().await.unwrap();
    assert!(backend.keys().is_empty());
    assert!(controller.get_cached_response("/admin", &store).await.is_none());
}

#[tokio::test]
async fn test_remote_store_keeps_foreign_namespaces() {
    let backend = Arc::new(InProcessBackend::default());
    backend
        .set("other:/api/users", b"foreign".to_vec(), None)
        .await
        .unwrap();

    let store = RemoteStore::new(backend.clone(), RemoteStoreConfig::default()).unwrap();
    store
        .store(
            "/api/users",
            ok("mine"),
            RequestSnapshot::new("GET", "/api/users"),
            Metadata::default(),
        )
        .await
        .unwrap();

    store.remove(&PathMatcher::prefix("/api")).await.unwrap();
    assert_eq!(backend.keys(), vec!["other:/api/users".to_string()]);
}
