//! Health Routes
//!
//! - GET / - Static acknowledgment
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (hub is running)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::{AckResponse, HealthResponse};
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::websocket::HubError;

/// GET /
pub async fn root() -> Json<AckResponse> {
    Json(AckResponse {
        message: "Emotion Analysis API".to_string(),
    })
}

/// GET /health/live
///
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Returns 200 while the connection hub accepts commands.
pub async fn readiness(State(state): State<Arc<AppState>>) -> ApiResult<StatusCode> {
    if state.hub().is_running() {
        Ok(StatusCode::OK)
    } else {
        Err(HubError::Closed.into())
    }
}

/// GET /health
///
/// Full health status with component details.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let hub_ok = state.hub().is_running();

    Json(HealthResponse {
        status: if hub_ok { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        started_at: state.started_at,
        connections: state.ws_connection_count(),
        window_samples: state.aggregator().len().await,
        dropped_broadcasts: state.hub().dropped_broadcasts(),
    })
}
