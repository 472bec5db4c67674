//! HTTP Surface
//!
//! Axum router that exposes the relay.
//!
//! # Endpoints
//!
//! - `GET /` - Viewer page (controller UI)
//! - `GET /ws?role=controller` - Controller connection
//! - `GET /ws?role=device&id=<id>` - Device connection
//! - `GET /healthz` - Liveness check
//! - `GET /health` - Connection counts and uptime
//!
//! # Example
//!
//! ```rust,no_run
//! use remote_relay::api::{serve, AppState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     serve(AppState::default(), "0.0.0.0:18081").await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::websocket::websocket_handler;

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/", get(routes::ui::index))
        .route("/ws", get(websocket_handler))
        .route("/healthz", get(routes::health::liveness))
        .route("/health", get(routes::health::full_health))
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state)
}

/// Bind `addr` and serve until a shutdown signal arrives
pub async fn serve(state: AppState, addr: &str) -> ApiResult<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("WebSocket relay listening on {}", addr);

    serve_on(listener, state).await
}

/// Serve on an already bound listener
pub async fn serve_on(listener: tokio::net::TcpListener, state: AppState) -> ApiResult<()> {
    let router = build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("WebSocket relay shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    fn create_test_app() -> (Router, Arc<crate::websocket::ConnectionHub>) {
        let state = AppState::default();
        let hub = Arc::clone(&state.hub);
        (build_router(state), hub)
    }

    async fn get(app: Router, uri: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_healthz() {
        let (app, _hub) = create_test_app();
        let response = get(app, "/healthz").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_health_full() {
        let (app, _hub) = create_test_app();
        let response = get(app, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["devices"], 0);
        assert_eq!(value["controllers"], 0);
    }

    #[tokio::test]
    async fn test_index_page() {
        let (app, _hub) = create_test_app();
        let response = get(app, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()["content-type"].to_str().unwrap();
        assert!(content_type.starts_with("text/html"));
    }

    #[tokio::test]
    async fn test_ws_missing_role() {
        let (app, hub) = create_test_app();
        let response = get(app, "/ws").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(hub.controller_count().await, 0);
    }

    #[tokio::test]
    async fn test_ws_bad_role() {
        let (app, hub) = create_test_app();
        let response = get(app, "/ws?role=admin").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(hub.controller_count().await, 0);
        assert_eq!(hub.device_count().await, 0);
    }

    #[tokio::test]
    async fn test_ws_device_without_id() {
        let (app, hub) = create_test_app();
        let response = get(app, "/ws?role=device").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(hub.device_count().await, 0);
    }

    #[tokio::test]
    async fn test_ws_valid_role_without_upgrade() {
        let (app, hub) = create_test_app();
        let response = get(app, "/ws?role=device&id=x4-001").await;
        assert!(response.status().is_client_error());
        assert_eq!(hub.device_count().await, 0);
    }
}
