//! WebSocket Relay
//!
//! Brokers frames between controllers and devices over persistent WebSocket
//! connections.
//!
//! ## Architecture
//!
//! - **ConnectionHub**: Registry of live connections, devices keyed by id
//! - **MessageRouter**: Unicasts commands, fans device reports out to controllers
//! - **Connection**: Inbound and outbound loops for one socket
//! - **Handler**: Validates the upgrade request and starts the connection
//! - **Messages**: Frame shapes and the tagged decode
//!
//! ## Usage
//!
//! Controllers connect to `/ws?role=controller`, devices to
//! `/ws?role=device&id=<device id>`.
//!
//! ```javascript
//! // Browser (controller)
//! const ws = new WebSocket('ws://localhost:18081/ws?role=controller');
//!
//! ws.onopen = () => {
//!   ws.send(JSON.stringify({type: 'command', action: 'next', deviceId: 'x4-001'}));
//! };
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data); // {type: 'status' | 'image', ...}
//!   console.log('Received:', msg);
//! };
//! ```
//!
//! Delivery is at most once. A frame for an absent device, or for a peer
//! whose queue is full, is dropped and the sender is not told.

mod connection;
mod handler;
mod hub;
mod messages;
mod router;

pub use connection::{Connection, ConnectionSettings};
pub use handler::{websocket_handler, ConnectError, ConnectParams};
pub use hub::{BroadcastReport, ClientHandle, ConnectionHub, ConnectionId, HubConfig, Role, SendOutcome};
pub use messages::{
    CodecError, CommandMessage, DeviceReport, Frame, ImageMessage, Payload, StatusMessage,
    DEFAULT_IMAGE_MIME,
};
pub use router::MessageRouter;
