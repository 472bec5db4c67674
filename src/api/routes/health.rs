//! Health Routes
//!
//! - GET /healthz - Liveness check, fixed body
//! - GET /health - Connection counts and uptime

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /healthz
///
/// Returns 200 with body `ok`. No dependency checks, no side effects.
pub async fn liveness() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// GET /health
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        devices: state.hub.device_count().await,
        controllers: state.hub.controller_count().await,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
