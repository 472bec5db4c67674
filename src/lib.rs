//! # Remote Relay
//!
//! Real-time WebSocket relay between controllers and devices.
//!
//! ## Features
//!
//! - **Commands**: controller → the one device registered under `deviceId`
//! - **Status and images**: device → every connected controller
//! - **Bounded queues**: 16 frames per connection, overflow is dropped
//! - **Liveness**: ping every 30s, connections silent for 60s are torn down
//!
//! ## Modules
//!
//! - [`websocket`]: Connection hub, router, codec and per-connection loops
//! - [`api`]: HTTP surface with Axum (upgrade endpoint, health, viewer page)
//! - [`config`]: TOML and environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use remote_relay::{serve, AppState, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env();
//!     let state = AppState::new(config.hub_config(), config.connection_settings());
//!     serve(state, &config.server.addr()).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod websocket;

pub use api::{build_router, serve, serve_on, ApiError, AppState};

pub use websocket::{
    websocket_handler, BroadcastReport, ClientHandle, CodecError, CommandMessage, ConnectError,
    Connection, ConnectionHub, ConnectionSettings, DeviceReport, Frame, HubConfig, ImageMessage,
    MessageRouter, Role, SendOutcome, StatusMessage,
};

pub use config::{Config, ConfigError, LoggingConfig, ServerConfig};
