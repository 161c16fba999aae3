//! Integration Tests for API Endpoints
//!
//! Drives the full router against an in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use etcd_gateway::{
    api::create_router,
    backend::{InMemoryBackend, KvBackend},
    cache::CacheStore,
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

// == Helper Functions ==

fn create_app(backend: &Arc<InMemoryBackend>, ttl: Duration) -> (Router, AppState) {
    let state = AppState::new(
        CacheStore::new(500, ttl),
        Some(backend.clone() as Arc<dyn KvBackend>),
    );
    (create_router(state.clone()), state)
}

fn create_test_app(backend: &Arc<InMemoryBackend>) -> (Router, AppState) {
    create_app(backend, Duration::from_secs(60))
}

fn create_degraded_app() -> Router {
    create_router(AppState::new(
        CacheStore::new(500, Duration::from_secs(60)),
        None,
    ))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/kv")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// == Scenarios ==

#[tokio::test]
async fn test_put_then_read_through() {
    let backend = Arc::new(InMemoryBackend::new());
    let (app, _) = create_test_app(&backend);

    let (status, body) = send(&app, post_json(r#"{"key":"a","value":"1"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    // First fetch comes from the backend, no `cached` field
    let (status, body) = send(&app, get("/kv/a")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"key": "a", "value": "1"}));

    let (status, body) = send(&app, get("/kv/a")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"key": "a", "value": "1", "cached": true}));

    assert_eq!(backend.get_calls(), 1);
}

#[tokio::test]
async fn test_delete_then_not_found() {
    let backend = Arc::new(InMemoryBackend::with_entries([("a", "1")]));
    let (app, _) = create_test_app(&backend);

    // Warm the cache so the delete has something to invalidate
    send(&app, get("/kv/a")).await;

    let (status, body) = send(&app, delete("/kv/a")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (status, body) = send(&app, get("/kv/a")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Key not found"}));
}

#[tokio::test]
async fn test_delete_absent_key_succeeds() {
    let backend = Arc::new(InMemoryBackend::new());
    let (app, _) = create_test_app(&backend);

    let (status, body) = send(&app, delete("/kv/never-there")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
}

#[tokio::test]
async fn test_put_missing_key() {
    let backend = Arc::new(InMemoryBackend::new());
    let (app, _) = create_test_app(&backend);

    let (status, body) = send(&app, post_json(r#"{"value":"1"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Key and value required"}));
    assert_eq!(backend.total_calls(), 0);
}

#[tokio::test]
async fn test_put_missing_value() {
    let backend = Arc::new(InMemoryBackend::new());
    let (app, _) = create_test_app(&backend);

    let (status, body) = send(&app, post_json(r#"{"key":"a"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Key and value required");
}

#[tokio::test]
async fn test_put_empty_value_allowed() {
    let backend = Arc::new(InMemoryBackend::new());
    let (app, _) = create_test_app(&backend);

    let (status, _) = send(&app, post_json(r#"{"key":"a","value":""}"#)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, get("/kv/a")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], "");
}

#[tokio::test]
async fn test_put_invalid_json() {
    let backend = Arc::new(InMemoryBackend::new());
    let (app, _) = create_test_app(&backend);

    let (status, body) = send(&app, post_json(r#"{"invalid json"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request");
    assert!(body["details"].is_string());
    assert_eq!(backend.total_calls(), 0);
}

#[tokio::test]
async fn test_percent_encoded_key_is_decoded() {
    let backend = Arc::new(InMemoryBackend::with_entries([("config/app name", "x")]));
    let (app, _) = create_test_app(&backend);

    let (status, body) = send(&app, get("/kv/config%2Fapp%20name")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["key"], "config/app name");
    assert_eq!(body["value"], "x");

    let (status, _) = send(&app, delete("/kv/config%2Fapp%20name")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(backend.value("config/app name"), None);
}

#[tokio::test]
async fn test_undecodable_key_is_bad_request() {
    let backend = Arc::new(InMemoryBackend::with_entries([("a", "1")]));
    let (app, _) = create_test_app(&backend);

    for request in [get("/kv/%FF"), delete("/kv/%FF")] {
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request");
        assert!(body["details"].is_string());
    }

    assert_eq!(backend.total_calls(), 0);
}

#[tokio::test]
async fn test_list_returns_backend_mapping() {
    let backend = Arc::new(InMemoryBackend::with_entries([("a", "1"), ("b", "2")]));
    let (app, state) = create_test_app(&backend);

    let (status, body) = send(&app, get("/kv")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"a": "1", "b": "2"}));

    // Listing never fills the cache
    assert!(state.cache.read().await.is_empty());
}

// == Cache Consistency ==

#[tokio::test]
async fn test_put_invalidates_cached_value() {
    let backend = Arc::new(InMemoryBackend::with_entries([("a", "old")]));
    let (app, state) = create_test_app(&backend);

    send(&app, get("/kv/a")).await;
    assert!(state.cache.read().await.has("a"));

    send(&app, post_json(r#"{"key":"a","value":"new"}"#)).await;
    assert!(!state.cache.read().await.has("a"));

    let (_, body) = send(&app, get("/kv/a")).await;
    assert_eq!(body, json!({"key": "a", "value": "new"}));
    assert_eq!(backend.get_calls(), 2);
}

#[tokio::test]
async fn test_external_write_visible_after_ttl() {
    let backend = Arc::new(InMemoryBackend::with_entries([("a", "1")]));
    let (app, _) = create_app(&backend, Duration::from_millis(100));

    send(&app, get("/kv/a")).await;

    // Another writer changes the key behind the gateway's back
    backend.insert_external("a", "2");
    let (_, body) = send(&app, get("/kv/a")).await;
    assert_eq!(body, json!({"key": "a", "value": "1", "cached": true}));

    tokio::time::sleep(Duration::from_millis(150)).await;

    let (_, body) = send(&app, get("/kv/a")).await;
    assert_eq!(body, json!({"key": "a", "value": "2"}));
}

#[tokio::test]
async fn test_backend_outage_returns_503_and_keeps_cache() {
    let backend = Arc::new(InMemoryBackend::with_entries([("a", "1")]));
    let (app, state) = create_test_app(&backend);

    send(&app, get("/kv/a")).await;
    backend.set_unavailable(true);

    // Cached reads keep working during the outage
    let (status, body) = send(&app, get("/kv/a")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cached"], true);

    // Uncached reads are 503, never 404
    let (status, body) = send(&app, get("/kv/b")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Etcd service unavailable or error");
    assert!(body["details"].as_str().unwrap().contains("unavailable"));

    let (status, _) = send(&app, post_json(r#"{"key":"a","value":"2"}"#)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = send(&app, delete("/kv/a")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = send(&app, get("/kv")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // Failed writes did not invalidate
    assert!(state.cache.read().await.has("a"));
}

// == Degraded Mode ==

#[tokio::test]
async fn test_missing_client_rejects_every_kv_route() {
    let app = create_degraded_app();

    let requests = vec![
        get("/kv/x"),
        post_json(r#"{"key":"x","value":"1"}"#),
        delete("/kv/x"),
        get("/kv"),
    ];

    for request in requests {
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!({"error": "Etcd client not initialized"}));
    }
}

#[tokio::test]
async fn test_missing_client_guard_runs_before_validation() {
    let app = create_degraded_app();

    let (status, _) = send(&app, post_json(r#"{"value":"1"}"#)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_health_reports_degraded_mode() {
    let app = create_degraded_app();

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["backend"], "not_initialized");
}

// == Operational Endpoints ==

#[tokio::test]
async fn test_health_endpoint() {
    let backend = Arc::new(InMemoryBackend::new());
    let (app, _) = create_test_app(&backend);

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["backend"], "connected");
    assert!(body.get("timestamp").is_some());

    backend.set_unavailable(true);
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["backend"], "unreachable");
}

#[tokio::test]
async fn test_stats_endpoint() {
    let backend = Arc::new(InMemoryBackend::with_entries([("a", "1")]));
    let (app, _) = create_test_app(&backend);

    send(&app, get("/kv/a")).await; // miss
    send(&app, get("/kv/a")).await; // hit
    send(&app, post_json(r#"{"key":"a","value":"2"}"#)).await; // invalidation

    let (status, body) = send(&app, get("/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hits"], 1);
    assert_eq!(body["misses"], 1);
    assert_eq!(body["invalidations"], 1);
    assert_eq!(body["total_entries"], 0);
    assert_eq!(body["max_entries"], 500);
    assert!(body.get("hit_rate").is_some());
}
