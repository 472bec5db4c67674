//! Message Router
//!
//! Decides where a decoded frame goes: commands to one device, device reports
//! to every controller. Nothing is retried; a frame that cannot be queued is
//! lost.

use std::sync::Arc;

use super::hub::ConnectionHub;
use super::messages::{CommandMessage, DeviceReport, Frame, ImageMessage, StatusMessage};

/// Stateless dispatch on top of the hub
#[derive(Clone)]
pub struct MessageRouter {
    hub: Arc<ConnectionHub>,
}

impl MessageRouter {
    pub fn new(hub: Arc<ConnectionHub>) -> Self {
        Self { hub }
    }

    /// Send a controller's command to the device it names
    pub async fn forward_command(&self, cmd: CommandMessage) {
        let device_id = cmd.device_id.clone();
        let action = cmd.action.clone();
        let payload = match Frame::Command(cmd).encode() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode command");
                return;
            }
        };

        let outcome = self.hub.send_to_device(&device_id, payload).await;
        tracing::debug!(device_id = %device_id, action = %action, outcome = ?outcome, "Forwarded command");
    }

    /// Fan a device status out to all controllers
    pub async fn broadcast_status(&self, status: StatusMessage) {
        self.broadcast(Frame::Status(status)).await;
    }

    /// Fan a device image out to all controllers
    pub async fn broadcast_image(&self, image: ImageMessage) {
        self.broadcast(Frame::Image(image)).await;
    }

    /// Route whatever a device reported
    pub async fn dispatch_report(&self, report: DeviceReport) {
        match report {
            DeviceReport::Status(status) => self.broadcast_status(status).await,
            DeviceReport::Image(image) => self.broadcast_image(image).await,
        }
    }

    async fn broadcast(&self, frame: Frame) {
        let kind = frame.kind();
        match frame.encode() {
            Ok(payload) => {
                self.hub.broadcast_to_controllers(payload).await;
            }
            Err(e) => {
                tracing::error!(error = %e, kind = kind, "Failed to encode frame");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::hub::{ClientHandle, HubConfig, Role};
    use crate::websocket::messages::DEFAULT_IMAGE_MIME;

    fn setup() -> (Arc<ConnectionHub>, MessageRouter) {
        let hub = Arc::new(ConnectionHub::new(HubConfig::default()));
        let router = MessageRouter::new(Arc::clone(&hub));
        (hub, router)
    }

    #[tokio::test]
    async fn test_command_reaches_named_device_only() {
        let (hub, router) = setup();
        let (a, mut a_rx) = ClientHandle::new(Role::Device("a".to_string()), 16);
        let (b, mut b_rx) = ClientHandle::new(Role::Device("b".to_string()), 16);
        let (ctl, mut ctl_rx) = ClientHandle::new(Role::Controller, 16);
        hub.add(a).await;
        hub.add(b).await;
        hub.add(ctl).await;

        router
            .forward_command(CommandMessage {
                action: "next".to_string(),
                device_id: "b".to_string(),
                url: Some("https://example.com/book".to_string()),
            })
            .await;

        let payload = b_rx.try_recv().unwrap();
        let frame = Frame::decode(payload.as_bytes()).unwrap();
        match frame {
            Frame::Command(cmd) => {
                assert_eq!(cmd.action, "next");
                assert_eq!(cmd.url.as_deref(), Some("https://example.com/book"));
            }
            _ => panic!("Expected Command"),
        }
        assert!(b_rx.try_recv().is_err());
        assert!(a_rx.try_recv().is_err());
        assert!(ctl_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_command_to_unknown_device_is_dropped() {
        let (hub, router) = setup();
        let (ctl, mut ctl_rx) = ClientHandle::new(Role::Controller, 16);
        hub.add(ctl).await;

        router
            .forward_command(CommandMessage {
                action: "prev".to_string(),
                device_id: "nobody".to_string(),
                url: None,
            })
            .await;

        assert!(ctl_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_report_reaches_every_controller() {
        let (hub, router) = setup();
        let (c1, mut c1_rx) = ClientHandle::new(Role::Controller, 16);
        let (c2, mut c2_rx) = ClientHandle::new(Role::Controller, 16);
        hub.add(c1).await;
        hub.add(c2).await;

        let report = DeviceReport::from_device(br#"{"type":"image","data":"AAAA"}"#, "x4-001")
            .unwrap();
        router.dispatch_report(report).await;

        for rx in [&mut c1_rx, &mut c2_rx] {
            let payload = rx.try_recv().unwrap();
            match Frame::decode(payload.as_bytes()).unwrap() {
                Frame::Image(image) => {
                    assert_eq!(image.device_id, "x4-001");
                    assert_eq!(image.mime.as_deref(), Some(DEFAULT_IMAGE_MIME));
                }
                _ => panic!("Expected Image"),
            }
        }
    }

    #[tokio::test]
    async fn test_status_broadcast() {
        let (hub, router) = setup();
        let (ctl, mut ctl_rx) = ClientHandle::new(Role::Controller, 16);
        hub.add(ctl).await;

        router
            .broadcast_status(StatusMessage {
                device_id: "x4-001".to_string(),
                status: "connected".to_string(),
                detail: Some("device ready".to_string()),
            })
            .await;

        let value: serde_json::Value =
            serde_json::from_str(&ctl_rx.try_recv().unwrap()).unwrap();
        assert_eq!(value["type"], "status");
        assert_eq!(value["detail"], "device ready");
    }
}
