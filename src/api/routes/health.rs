//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (hub answering)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
///
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Returns 200 once the hub answers; the hub is in-memory, so reaching it
/// at all means the service can accept subscribers.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    let _ = state.hub.subscriber_count().await;
    StatusCode::OK
}

/// GET /health
///
/// Full health status with subscriber and job counts.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        address: state.config.addr(),
        subscribers: state.hub.subscriber_count().await,
        jobs: state.job_count().await,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
