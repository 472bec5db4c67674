//! Connection Lifecycle
//!
//! One [`Connection`] per upgraded socket. The inbound loop runs on the
//! upgrade task and the outbound loop on a task of its own; whichever stops
//! first takes the other down with it.

use axum::extract::ws::{close_code, Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant, MissedTickBehavior};

use super::hub::{ClientHandle, ConnectionHub, ConnectionId, Role};
use super::messages::{CommandMessage, DeviceReport, Payload};
use super::router::MessageRouter;

/// Deadlines and limits applied to every connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Tear the connection down when nothing (not even a pong) arrives for this long
    pub read_timeout: Duration,
    /// How often to ping an otherwise quiet peer
    pub ping_interval: Duration,
    /// Upper bound on a single frame, ping or close write
    pub write_timeout: Duration,
    /// Largest inbound frame accepted
    pub max_message_bytes: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(60),
            ping_interval: Duration::from_secs(30),
            write_timeout: Duration::from_secs(10),
            max_message_bytes: 8 << 20,
        }
    }
}

/// Why the inbound loop stopped
#[derive(Debug)]
enum ReadExit {
    PeerClosed,
    IdleTimeout,
    Error(axum::Error),
}

/// A registered connection and everything its loops need
pub struct Connection {
    handle: Arc<ClientHandle>,
    hub: Arc<ConnectionHub>,
    router: MessageRouter,
    settings: ConnectionSettings,
}

impl Connection {
    /// Create the connection and register it with the hub.
    ///
    /// Returns the receiving end of the outbound queue for [`Connection::run`].
    pub async fn open(
        role: Role,
        hub: Arc<ConnectionHub>,
        router: MessageRouter,
        settings: ConnectionSettings,
    ) -> (Self, mpsc::Receiver<Payload>) {
        let (handle, outbound) = ClientHandle::new(role, hub.config().queue_capacity);
        hub.add(Arc::clone(&handle)).await;
        let connection = Self {
            handle,
            hub,
            router,
            settings,
        };
        (connection, outbound)
    }

    pub fn id(&self) -> ConnectionId {
        self.handle.id
    }

    /// Drive the connection until either loop stops, then tear it down
    pub async fn run(self, socket: WebSocket, outbound: mpsc::Receiver<Payload>) {
        let (sink, mut stream) = socket.split();
        let connection_id = self.handle.id;

        let mut writer = tokio::spawn(write_loop(
            sink,
            outbound,
            self.settings.clone(),
            connection_id,
        ));

        tokio::select! {
            exit = self.read_loop(&mut stream) => {
                log_read_exit(&self.handle, &exit);
                let write_timeout = self.settings.write_timeout;
                self.release().await;
                // the queue is closed now; let the writer send its close frame
                if timeout(write_timeout, &mut writer).await.is_err() {
                    writer.abort();
                }
            }
            _ = &mut writer => {
                tracing::debug!(connection_id = %connection_id, "Write loop ended, closing connection");
                self.release().await;
            }
        }

        tracing::debug!(connection_id = %connection_id, "Connection closed");
    }

    /// Deregister and drop our handle on the outbound queue
    async fn release(self) {
        self.hub.remove(&self.handle).await;
    }

    async fn read_loop(&self, stream: &mut SplitStream<WebSocket>) -> ReadExit {
        loop {
            let next = match timeout(self.settings.read_timeout, stream.next()).await {
                Ok(next) => next,
                Err(_) => return ReadExit::IdleTimeout,
            };

            let message = match next {
                Some(Ok(message)) => message,
                Some(Err(e)) => return ReadExit::Error(e),
                None => return ReadExit::PeerClosed,
            };

            match message {
                Message::Text(text) => self.handle_frame(text.as_bytes()).await,
                Message::Binary(data) => self.handle_frame(&data).await,
                // any traffic, pongs included, restarts the idle deadline
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Close(frame) => {
                    if let Some(frame) = frame {
                        let expected = matches!(
                            frame.code,
                            close_code::NORMAL | close_code::AWAY | close_code::ABNORMAL
                        );
                        if !expected {
                            tracing::warn!(
                                connection_id = %self.handle.id,
                                code = frame.code,
                                reason = %frame.reason,
                                "Unexpected close from peer"
                            );
                        }
                    }
                    return ReadExit::PeerClosed;
                }
            }
        }
    }

    async fn handle_frame(&self, bytes: &[u8]) {
        match &self.handle.role {
            Role::Controller => match CommandMessage::from_controller(bytes) {
                Ok(cmd) => self.router.forward_command(cmd).await,
                Err(e) => {
                    tracing::warn!(connection_id = %self.handle.id, error = %e, "Discarding controller frame");
                }
            },
            Role::Device(device_id) => match DeviceReport::from_device(bytes, device_id) {
                Ok(report) => self.router.dispatch_report(report).await,
                Err(e) => {
                    tracing::warn!(device_id = %device_id, error = %e, "Discarding device frame");
                }
            },
        }
    }
}

fn log_read_exit(handle: &ClientHandle, exit: &ReadExit) {
    match exit {
        ReadExit::PeerClosed => {
            tracing::debug!(connection_id = %handle.id, role = %handle.role, "Peer closed connection");
        }
        ReadExit::IdleTimeout => {
            tracing::info!(connection_id = %handle.id, role = %handle.role, "Read deadline expired, dropping connection");
        }
        ReadExit::Error(e) => {
            tracing::warn!(connection_id = %handle.id, role = %handle.role, error = %e, "WebSocket read error");
        }
    }
}

/// Drain the outbound queue onto the socket, pinging between payloads.
///
/// Ends on a write failure or once the queue is closed, in which case a close
/// frame goes out first.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Payload>,
    settings: ConnectionSettings,
    connection_id: ConnectionId,
) {
    let mut ping = tokio::time::interval_at(
        Instant::now() + settings.ping_interval,
        settings.ping_interval,
    );
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let message = tokio::select! {
            next = outbound.recv() => match next {
                Some(payload) => Message::Text(payload.to_string()),
                None => {
                    let _ = timeout(settings.write_timeout, sink.send(Message::Close(None))).await;
                    break;
                }
            },
            _ = ping.tick() => Message::Ping(Vec::new()),
        };

        match timeout(settings.write_timeout, sink.send(message)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
                break;
            }
            Err(_) => {
                tracing::debug!(connection_id = %connection_id, "WebSocket write deadline expired");
                break;
            }
        }
    }

    let _ = sink.close().await;
}
