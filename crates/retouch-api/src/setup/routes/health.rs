//! Health check handlers and response types.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthCheckResponse {
    pub status: String,
    pub sessions: usize,
    pub max_sessions: usize,
    pub operations: usize,
    pub uptime_secs: u64,
}

/// Liveness check: the process is running.
pub async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Health check with session store occupancy
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service healthy", body = HealthCheckResponse),
        (status = 503, description = "Session store full", body = HealthCheckResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let sessions = state.sessions.len();
    let max_sessions = state.sessions.capacity();
    let full = sessions >= max_sessions;

    let response = HealthCheckResponse {
        status: if full { "degraded" } else { "healthy" }.to_string(),
        sessions,
        max_sessions,
        operations: state.catalog.operations().len(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    };

    let status_code = if full {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status_code, Json(response))
}
