//! HTTP API for the cache router
//!
//! - `GET /cache/:key`, `PUT /cache/:key` (`{"value": ...}`), `DELETE /cache/:key`
//! - `GET /health` (cluster health), `GET /health/live` (process liveness)
//!
//! Each request gets its own deadline from the server config.

use crate::common::tracing_middleware::request_tracing_middleware;
use crate::common::{Error, OpContext};
use crate::router::service::CacheService;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;

/// Shared state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CacheService>,
    pub request_timeout: Duration,
    pub health_timeout: Duration,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(service: Arc<CacheService>) -> Self {
        Self {
            service,
            request_timeout: Duration::from_secs(5),
            health_timeout: Duration::from_secs(10),
            max_body_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheResponse {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetRequest {
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy", "degraded" or "unhealthy"
    pub status: String,
    pub nodes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthy: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
}

/// Error reply with a stable outward message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: &'static str,
    message: Option<String>,
}

impl ApiError {
    fn bad_request(error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
            message: Some(message.into()),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self {
            status: e.to_http_status(),
            error: e.public_message(),
            message: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.error.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Creates the HTTP router with all public endpoints.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.max_body_bytes;
    Router::new()
        .route(
            "/cache/",
            get(missing_key).put(missing_key).delete(missing_key),
        )
        .route(
            "/cache/:key",
            get(get_cache).put(set_cache).delete(delete_cache),
        )
        .route("/health", get(health))
        .route("/health/live", get(health_live))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(axum::middleware::from_fn(request_tracing_middleware))
        .with_state(state)
}

async fn missing_key() -> ApiError {
    ApiError::bad_request("invalid key", "key cannot be empty")
}

async fn get_cache(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<CacheResponse>, ApiError> {
    let ctx = OpContext::with_timeout(state.request_timeout);
    let value = state.service.get(&ctx, &key).await?;
    Ok(Json(CacheResponse { key, value }))
}

async fn set_cache(
    State(state): State<AppState>,
    Path(key): Path<String>,
    payload: Result<Json<SetRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CacheResponse>), ApiError> {
    let Json(req) =
        payload.map_err(|e| ApiError::bad_request("invalid request body", e.body_text()))?;

    let ctx = OpContext::with_timeout(state.request_timeout);
    state.service.set(&ctx, &key, &req.value).await?;
    Ok((
        StatusCode::CREATED,
        Json(CacheResponse {
            key,
            value: req.value,
        }),
    ))
}

async fn delete_cache(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    let ctx = OpContext::with_timeout(state.request_timeout);
    state.service.delete(&ctx, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Cluster health: 200 while any node answers, 503 when none do.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let ctx = OpContext::with_timeout(state.health_timeout);
    let mut nodes = state.service.get_nodes();
    nodes.sort();

    match state.service.health_check(&ctx).await {
        Ok(report) => {
            let status = if report.is_degraded() {
                "degraded"
            } else {
                "healthy"
            };
            (
                StatusCode::OK,
                Json(HealthResponse {
                    status: status.to_string(),
                    nodes,
                    healthy: Some(report.healthy),
                    total: Some(report.total),
                }),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy".to_string(),
                    nodes,
                    healthy: None,
                    total: None,
                }),
            )
        }
    }
}

/// Liveness probe: the process answers.
async fn health_live() -> impl IntoResponse {
    Json(serde_json::json!({
        "alive": true,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
