use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use readthru_cache::ConnectionStatus;
use serde::Serialize;
use serde_json::json;

use crate::origin::OriginError;
use crate::server::AppState;

/// Error returned by the data endpoints.
///
/// The origin failure is logged; clients only see which resource failed.
#[derive(Debug, thiserror::Error)]
#[error("Failed to {action}")]
pub struct ApiError {
    action: &'static str,
    #[source]
    source: OriginError,
}

impl ApiError {
    pub fn new(action: &'static str, source: OriginError) -> Self {
        Self { action, source }
    }

    fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.source, "Error trying to {}", self.action);
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    backend: &'static str,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let backend = match state.api.cache().backend_status() {
        ConnectionStatus::Ready => "ready",
        ConnectionStatus::Connecting | ConnectionStatus::Unconnected => "pending",
        ConnectionStatus::Failed => "unavailable",
    };
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            backend,
        }),
    )
}

pub async fn users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .api
        .fetch_users()
        .await
        .map_err(|e| ApiError::new("fetch users", e))?;
    Ok(Json(result))
}

pub async fn user(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .api
        .fetch_user_by_id(id)
        .await
        .map_err(|e| ApiError::new("fetch user", e))?;
    Ok(Json(result))
}

pub async fn user_posts(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .api
        .fetch_posts_by_user_id(id)
        .await
        .map_err(|e| ApiError::new("fetch posts", e))?;
    Ok(Json(result))
}

pub async fn posts(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .api
        .fetch_posts()
        .await
        .map_err(|e| ApiError::new("fetch posts", e))?;
    Ok(Json(result))
}

pub async fn benchmark(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .api
        .benchmark_performance()
        .await
        .map_err(|e| ApiError::new("run benchmark", e))?;
    Ok(Json(result))
}

pub async fn metrics() -> Response {
    match crate::metrics::render_metrics() {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics exporter not installed").into_response(),
    }
}
