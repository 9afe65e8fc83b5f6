//! Integration Tests for the demo service
//!
//! Drives the full router, cache middleware included, with oneshot requests.

mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use common::InProcessBackend;
use response_cache::{
    cache::{BoundedMemoryStore, MemoryStoreConfig, RemoteStore, RemoteStoreConfig, Store},
    create_router, AppState,
};
use serde_json::Value;
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> (Router, Arc<BoundedMemoryStore>) {
    let store = Arc::new(BoundedMemoryStore::new(MemoryStoreConfig::new(100)).unwrap());
    let state = AppState::new(store.clone(), 300).unwrap();
    (create_router(state), store)
}

fn create_remote_app() -> (Router, Arc<InProcessBackend>) {
    let backend = Arc::new(InProcessBackend::default());
    let store = RemoteStore::new(backend.clone(), RemoteStoreConfig::default()).unwrap();
    let state = AppState::new(Arc::new(store), 300).unwrap();
    (create_router(state), backend)
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn cache_status(response: &Response) -> Option<&str> {
    response
        .headers()
        .get("x-cache")
        .and_then(|v| v.to_str().ok())
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// == Cached Reads ==

#[tokio::test]
async fn test_second_get_served_from_cache() {
    let (app, store) = create_test_app();

    let first = send(&app, get("/items")).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(cache_status(&first), Some("MISS"));
    assert_eq!(store.len().await, 1);

    let second = send(&app, get("/items")).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(cache_status(&second), Some("HIT"));
    assert_eq!(
        second.headers().get("content-type").unwrap(),
        "application/json"
    );
    assert_eq!(body_to_json(second.into_body()).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_query_string_is_part_of_key() {
    let (app, store) = create_test_app();

    send(&app, get("/items?page=1")).await;
    let other = send(&app, get("/items?page=2")).await;

    assert_eq!(cache_status(&other), Some("MISS"));
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_no_cache_request_bypasses_cache() {
    let (app, store) = create_test_app();

    let request = Request::builder()
        .uri("/items")
        .header("cache-control", "no-cache")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cache_status(&response), None);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_error_responses_not_cached() {
    let (app, store) = create_test_app();

    let response = send(&app, get("/items/42")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(store.is_empty().await);

    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("item 42"));
}

#[tokio::test]
async fn test_unmatched_validator_serves_full_body() {
    let (app, _store) = create_test_app();
    send(&app, json_request("POST", "/items", r#"{"name":"bolt"}"#)).await;

    // Demo handlers emit no ETag, so no validator can match.
    send(&app, get("/items/1")).await;
    let request = Request::builder()
        .uri("/items/1")
        .header("if-none-match", "\"anything\"")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cache_status(&response), Some("HIT"));
}

// == Invalidation ==

#[tokio::test]
async fn test_post_invalidates_cached_list() {
    let (app, store) = create_test_app();

    send(&app, get("/items")).await;
    assert_eq!(cache_status(&send(&app, get("/items")).await), Some("HIT"));

    let created = send(&app, json_request("POST", "/items", r#"{"name":"bolt"}"#)).await;
    assert_eq!(created.status(), StatusCode::CREATED);
    assert!(store.is_empty().await);

    let fresh = send(&app, get("/items")).await;
    assert_eq!(cache_status(&fresh), Some("MISS"));
    let json = body_to_json(fresh.into_body()).await;
    assert_eq!(json[0]["name"], "bolt");
}

#[tokio::test]
async fn test_update_and_delete_invalidate_item() {
    let (app, _store) = create_test_app();
    send(&app, json_request("POST", "/items", r#"{"name":"bolt"}"#)).await;

    send(&app, get("/items/1")).await;
    let updated = send(&app, json_request("PUT", "/items/1", r#"{"name":"nut"}"#)).await;
    assert_eq!(updated.status(), StatusCode::OK);

    let fetched = send(&app, get("/items/1")).await;
    assert_eq!(cache_status(&fetched), Some("MISS"));
    assert_eq!(body_to_json(fetched.into_body()).await["name"], "nut");

    let deleted = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri("/items/1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    assert_eq!(send(&app, get("/items/1")).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_mutation_keeps_cache() {
    let (app, store) = create_test_app();

    send(&app, get("/items")).await;
    let rejected = send(&app, json_request("POST", "/items", r#"{"name":""}"#)).await;
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_remote_store_post_invalidates_cached_list() {
    let (app, backend) = create_remote_app();

    assert_eq!(cache_status(&send(&app, get("/items")).await), Some("MISS"));
    assert_eq!(backend.keys(), vec!["cache:/items#GET".to_string()]);
    assert_eq!(backend.expiry("cache:/items#GET"), Some(300));
    assert_eq!(cache_status(&send(&app, get("/items")).await), Some("HIT"));

    let created = send(&app, json_request("POST", "/items", r#"{"name":"widget"}"#)).await;
    assert_eq!(created.status(), StatusCode::CREATED);
    assert!(backend.keys().is_empty());

    let fresh = send(&app, get("/items")).await;
    assert_eq!(cache_status(&fresh), Some("MISS"));
    let json = body_to_json(fresh.into_body()).await;
    assert_eq!(json[0]["name"], "widget");
}

#[tokio::test]
async fn test_remote_store_update_invalidates_item() {
    let (app, backend) = create_remote_app();
    send(&app, json_request("POST", "/items", r#"{"name":"bolt"}"#)).await;

    send(&app, get("/items/1")).await;
    send(&app, get("/items?page=2")).await;
    assert_eq!(backend.keys().len(), 2);

    let updated = send(&app, json_request("PUT", "/items/1", r#"{"name":"nut"}"#)).await;
    assert_eq!(updated.status(), StatusCode::OK);
    assert!(backend.keys().is_empty());

    let fetched = send(&app, get("/items/1")).await;
    assert_eq!(cache_status(&fetched), Some("MISS"));
    assert_eq!(body_to_json(fetched.into_body()).await["name"], "nut");
}

// == Service Endpoints ==

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _store) = create_test_app();

    let response = send(&app, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["backend"], "memory");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_stats_track_hits_and_misses() {
    let (app, _store) = create_test_app();

    send(&app, get("/items")).await;
    send(&app, get("/items")).await;
    send(&app, get("/items")).await;

    let response = send(&app, get("/stats")).await;
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["hits"], 2);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["stores"], 1);
    assert_eq!(json["entries"], 1);
}

#[tokio::test]
async fn test_closed_store_degrades_to_uncached() {
    let (app, store) = create_test_app();
    store.close().await.unwrap();

    let first = send(&app, get("/items")).await;
    let second = send(&app, get("/items")).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(cache_status(&second), Some("MISS"));
}
