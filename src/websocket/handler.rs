//! WebSocket Handler
//!
//! Validates upgrade requests and hands accepted sockets to a [`Connection`].

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use super::connection::Connection;
use super::hub::Role;
use crate::api::{ApiError, AppState};

/// Query parameters accepted on `/ws`
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    /// `controller` or `device`
    pub role: Option<String>,
    /// Device id, required for devices
    pub id: Option<String>,
}

/// Why an upgrade request was refused
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectError {
    #[error("role must be controller or device")]
    InvalidRole,

    #[error("device role requires id")]
    MissingDeviceId,
}

impl ConnectParams {
    /// Classify the connection before any state is created for it
    pub fn into_role(self) -> Result<Role, ConnectError> {
        match self.role.as_deref() {
            Some("controller") => Ok(Role::Controller),
            Some("device") => match self.id {
                Some(id) if !id.is_empty() => Ok(Role::Device(id)),
                _ => Err(ConnectError::MissingDeviceId),
            },
            _ => Err(ConnectError::InvalidRole),
        }
    }
}

/// WebSocket upgrade handler
///
/// The query is validated before the upgrade itself is looked at, so a bad
/// request is refused with 400 whether or not it asked for an upgrade.
pub async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ConnectParams>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let role = match params.into_role() {
        Ok(role) => role,
        Err(e) => return ApiError::Validation(e.to_string()).into_response(),
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected WebSocket upgrade");
            return rejection.into_response();
        }
    };

    let max_message_bytes = state.connection.max_message_bytes;
    ws.max_message_size(max_message_bytes)
        .on_upgrade(move |socket| handle_socket(socket, role, state))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, role: Role, state: Arc<AppState>) {
    let (connection, outbound) = Connection::open(
        role,
        Arc::clone(&state.hub),
        state.router.clone(),
        state.connection.clone(),
    )
    .await;

    tracing::debug!(connection_id = %connection.id(), "WebSocket upgraded");
    connection.run(socket, outbound).await;
}
