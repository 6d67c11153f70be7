//! HTTP API tests

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use shardcache::backend::{DynBackend, MemoryBackend};
use shardcache::client::HttpClient;
use shardcache::router::http::{create_router, AppState, CacheResponse, ErrorResponse, HealthResponse};
use shardcache::{CacheService, Error, NodeRegistry, ServiceConfig};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn cluster(names: &[&str]) -> (Vec<Arc<MemoryBackend>>, AppState) {
    let backends: Vec<Arc<MemoryBackend>> =
        names.iter().map(|n| Arc::new(MemoryBackend::new(*n))).collect();
    let registry: NodeRegistry = names
        .iter()
        .zip(&backends)
        .map(|(n, b)| (*n, b.clone() as DynBackend))
        .collect();
    let nodes = names.iter().map(|n| n.to_string()).collect();
    let service = CacheService::new(ServiceConfig::new(nodes, registry)).unwrap();
    (backends, AppState::new(Arc::new(service)))
}

async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = create_router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

fn put(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_put_get_delete() {
    let (_b, state) = cluster(&["node1", "node2"]);

    let (status, body) = send(&state, put("/cache/user:1", r#"{"value":"alice"}"#)).await;
    assert_eq!(status, StatusCode::CREATED);
    let created: CacheResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(created.value, "alice");

    let (status, body) = send(&state, get("/cache/user:1")).await;
    assert_eq!(status, StatusCode::OK);
    let fetched: CacheResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(fetched.key, "user:1");
    assert_eq!(fetched.value, "alice");

    let (status, _) = send(&state, delete("/cache/user:1")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&state, get("/cache/user:1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(err.error, "key not found");
}

#[tokio::test]
async fn test_bad_requests() {
    let (_b, state) = cluster(&["node1"]);

    let (status, _) = send(&state, get("/cache/")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&state, put("/cache/k", "not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(err.error, "invalid request body");

    let (status, body) = send(&state, put("/cache/k", r#"{"value":""}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(err.error, "invalid value");
}

#[tokio::test]
async fn test_unavailable_node_is_503() {
    let (backends, state) = cluster(&["node1"]);
    backends[0].set_available(false);

    let (status, _) = send(&state, get("/cache/k")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_health_statuses() {
    let (backends, state) = cluster(&["node1", "node2"]);

    let (status, body) = send(&state, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let health: HealthResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.nodes, vec!["node1", "node2"]);
    assert_eq!(health.healthy, Some(2));

    backends[0].set_available(false);
    let (status, body) = send(&state, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let health: HealthResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.status, "degraded");
    assert_eq!(health.healthy, Some(1));

    backends[1].set_available(false);
    let (status, body) = send(&state, get("/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let health: HealthResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.status, "unhealthy");

    let (status, _) = send(&state, get("/health/live")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_echoed() {
    let (_b, state) = cluster(&["node1"]);
    let request = Request::builder()
        .uri("/health/live")
        .header("X-Request-ID", "req-42")
        .body(Body::empty())
        .unwrap();

    let response = create_router(state).oneshot(request).await.unwrap();
    assert_eq!(response.headers().get("X-Request-ID").unwrap(), "req-42");
}

#[tokio::test]
async fn test_http_client_against_live_server() {
    let (_b, state) = cluster(&["node1", "node2", "node3"]);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });

    let client = HttpClient::new(format!("http://{}", addr), Duration::from_secs(5)).unwrap();

    client.set("a/b c", "spaced").await.unwrap();
    assert_eq!(client.get("a/b c").await.unwrap(), "spaced");

    client.delete("a/b c").await.unwrap();
    assert!(matches!(client.get("a/b c").await, Err(Error::KeyNotFound(_))));
    assert!(matches!(client.set("k", "").await, Err(Error::InvalidValue)));

    let health = client.health().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.total, Some(3));
}
