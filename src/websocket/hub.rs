//! WebSocket Connection Hub
//!
//! Registry of live connections, keyed by role. Devices are indexed by their
//! id, controllers by connection id. Routing takes the read side of the lock
//! and never waits on a peer: every delivery is a `try_send` onto the peer's
//! bounded queue, and a full queue drops the payload.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::messages::Payload;

/// Unique identifier for a WebSocket connection
pub type ConnectionId = Uuid;

/// Which side of the relay a connection belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Controller,
    Device(String),
}

impl Role {
    /// Device id for device connections
    pub fn device_id(&self) -> Option<&str> {
        match self {
            Role::Controller => None,
            Role::Device(id) => Some(id),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Controller => f.write_str("controller"),
            Role::Device(_) => f.write_str("device"),
        }
    }
}

/// Configuration for the connection hub
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Capacity of each connection's outbound queue
    pub queue_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self { queue_capacity: 16 }
    }
}

/// Handle for sending messages to a specific connection.
///
/// Shared between the registry and the connection that owns it. The outbound
/// queue closes once both have let go.
#[derive(Debug)]
pub struct ClientHandle {
    pub id: ConnectionId,
    pub role: Role,
    sender: mpsc::Sender<Payload>,
}

impl ClientHandle {
    /// Create a handle with a fresh bounded queue, returning the receiving end
    pub fn new(role: Role, capacity: usize) -> (Arc<Self>, mpsc::Receiver<Payload>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = Arc::new(Self {
            id: Uuid::new_v4(),
            role,
            sender,
        });
        (handle, receiver)
    }

    fn try_deliver(&self, payload: Payload) -> SendOutcome {
        match self.sender.try_send(payload) {
            Ok(()) => SendOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => SendOutcome::Backpressure,
            Err(mpsc::error::TrySendError::Closed(_)) => SendOutcome::Closed,
        }
    }
}

/// Result of a unicast attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Payload is on the target's queue
    Queued,
    /// No device registered under the id
    NoTarget,
    /// Target queue full, payload dropped
    Backpressure,
    /// Target is shutting down, payload dropped
    Closed,
}

/// Per-recipient tally of a broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: usize,
}

#[derive(Default)]
struct Registry {
    devices: HashMap<String, Arc<ClientHandle>>,
    controllers: HashMap<ConnectionId, Arc<ClientHandle>>,
}

/// Manages all WebSocket connections
pub struct ConnectionHub {
    registry: RwLock<Registry>,
    config: HubConfig,
}

impl ConnectionHub {
    /// Create a new connection hub
    pub fn new(config: HubConfig) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            config,
        }
    }

    /// Hub configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Register a connection.
    ///
    /// A device replaces any earlier registration under the same id.
    pub async fn add(&self, handle: Arc<ClientHandle>) {
        let mut registry = self.registry.write().await;
        match handle.role.device_id().map(str::to_owned) {
            Some(device_id) => {
                let connection_id = handle.id;
                if let Some(previous) = registry.devices.insert(device_id.clone(), handle) {
                    tracing::warn!(
                        device_id = %device_id,
                        connection_id = %connection_id,
                        replaced = %previous.id,
                        "Device re-registered, replacing earlier connection"
                    );
                }
                tracing::info!(device_id = %device_id, connection_id = %connection_id, "Device connected");
            }
            None => {
                let connection_id = handle.id;
                registry.controllers.insert(connection_id, handle);
                tracing::info!(connection_id = %connection_id, "Controller connected");
            }
        }
    }

    /// Deregister a connection.
    ///
    /// A device entry is only removed when it is this exact handle, so a stale
    /// connection tearing down late cannot evict its replacement. Removing an
    /// absent connection is a no-op. Returns whether anything was removed.
    pub async fn remove(&self, handle: &Arc<ClientHandle>) -> bool {
        let mut registry = self.registry.write().await;
        match &handle.role {
            Role::Device(device_id) => {
                let is_current = registry
                    .devices
                    .get(device_id)
                    .is_some_and(|current| Arc::ptr_eq(current, handle));
                if is_current {
                    registry.devices.remove(device_id);
                    tracing::info!(device_id = %device_id, connection_id = %handle.id, "Device disconnected");
                }
                is_current
            }
            Role::Controller => {
                let removed = registry.controllers.remove(&handle.id).is_some();
                if removed {
                    tracing::info!(connection_id = %handle.id, "Controller disconnected");
                }
                removed
            }
        }
    }

    /// Queue a payload for the device registered under `device_id`
    pub async fn send_to_device(&self, device_id: &str, payload: Payload) -> SendOutcome {
        let registry = self.registry.read().await;
        let Some(target) = registry.devices.get(device_id) else {
            tracing::warn!(device_id = %device_id, "No device for command");
            return SendOutcome::NoTarget;
        };

        let outcome = target.try_deliver(payload);
        match outcome {
            SendOutcome::Backpressure => {
                tracing::warn!(device_id = %device_id, "Device queue full, dropping command");
            }
            SendOutcome::Closed => {
                tracing::debug!(device_id = %device_id, "Device closing, dropping command");
            }
            _ => {}
        }
        outcome
    }

    /// Queue a payload for every registered controller.
    ///
    /// Each controller is tried independently; a full queue only costs that
    /// controller its copy.
    pub async fn broadcast_to_controllers(&self, payload: Payload) -> BroadcastReport {
        let registry = self.registry.read().await;
        let mut report = BroadcastReport::default();

        for (id, controller) in &registry.controllers {
            match controller.try_deliver(Arc::clone(&payload)) {
                SendOutcome::Queued => report.delivered += 1,
                outcome => {
                    report.dropped += 1;
                    tracing::warn!(connection_id = %id, outcome = ?outcome, "Controller queue unavailable, dropping frame");
                }
            }
        }

        tracing::trace!(
            delivered = report.delivered,
            dropped = report.dropped,
            "Broadcast to controllers"
        );
        report
    }

    /// Number of registered devices
    pub async fn device_count(&self) -> usize {
        self.registry.read().await.devices.len()
    }

    /// Number of registered controllers
    pub async fn controller_count(&self) -> usize {
        self.registry.read().await.controllers.len()
    }

    /// Whether a device is registered under `device_id`
    pub async fn has_device(&self, device_id: &str) -> bool {
        self.registry.read().await.devices.contains_key(device_id)
    }
}
