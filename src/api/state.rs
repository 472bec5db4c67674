//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use crate::websocket::{ConnectionHub, ConnectionSettings, HubConfig, MessageRouter};
use std::sync::Arc;
use std::time::Instant;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Registry of live connections
    pub hub: Arc<ConnectionHub>,
    /// Dispatch layered on the hub
    pub router: MessageRouter,
    /// Deadlines applied to each accepted connection
    pub connection: ConnectionSettings,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState with its own hub
    pub fn new(hub_config: HubConfig, connection: ConnectionSettings) -> Self {
        let hub = Arc::new(ConnectionHub::new(hub_config));
        let router = MessageRouter::new(Arc::clone(&hub));
        Self {
            hub,
            router,
            connection,
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(HubConfig::default(), ConnectionSettings::default())
    }
}
