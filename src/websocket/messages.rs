//! WebSocket Message Types
//!
//! Defines the three frame shapes relayed between controllers and devices,
//! and the tagged decode that selects a variant by its `type` field.

use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Media type assumed for image frames that do not carry one
pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// An encoded frame ready to be queued for one or more connections.
///
/// Shared so that a broadcast encodes once and clones a pointer per recipient.
pub type Payload = Arc<str>;

/// Command issued by a controller for a single device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandMessage {
    /// What the device should do (e.g. "next", "prev", "capture")
    pub action: String,
    /// Target device
    pub device_id: String,
    /// Optional page to open
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Progress report from a device, fanned out to all controllers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    /// Reporting device; filled from the connection when empty
    #[serde(default, deserialize_with = "null_as_empty")]
    pub device_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Image frame from a device, fanned out to all controllers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMessage {
    /// Reporting device; filled from the connection when empty
    #[serde(default, deserialize_with = "null_as_empty")]
    pub device_id: String,
    /// Base64 image bytes without a data URI prefix. Never inspected.
    pub data: String,
    /// Media type label, defaults to [`DEFAULT_IMAGE_MIME`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
}

/// Every frame the relay understands, selected by the `type` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Frame {
    Command(CommandMessage),
    Status(StatusMessage),
    Image(ImageMessage),
}

/// What a device may send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceReport {
    Status(StatusMessage),
    Image(ImageMessage),
}

/// Treat an explicit `null` like a missing string
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Only used to classify a frame that failed to decode
#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
}

const KNOWN_TYPES: [&str; 3] = ["command", "status", "image"];

impl Frame {
    /// Decode a raw frame into one of the known variants.
    ///
    /// A `type` outside the known set is reported as [`CodecError::UnknownType`]
    /// rather than as a generic parse failure.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        serde_json::from_slice::<Frame>(bytes).map_err(|e| {
            match serde_json::from_slice::<Envelope>(bytes) {
                Ok(env) if !KNOWN_TYPES.contains(&env.kind.as_str()) => {
                    CodecError::UnknownType(env.kind)
                }
                _ => CodecError::Malformed(e),
            }
        })
    }

    /// Serialize for the wire
    pub fn encode(&self) -> Result<Payload, CodecError> {
        let text = serde_json::to_string(self).map_err(CodecError::Malformed)?;
        Ok(Payload::from(text))
    }

    /// Discriminator value as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Command(_) => "command",
            Frame::Status(_) => "status",
            Frame::Image(_) => "image",
        }
    }
}

impl CommandMessage {
    /// Decode a frame received from a controller. Only commands are accepted.
    pub fn from_controller(bytes: &[u8]) -> Result<Self, CodecError> {
        match Frame::decode(bytes)? {
            Frame::Command(mut cmd) => {
                cmd.url = non_empty(cmd.url);
                Ok(cmd)
            }
            other => Err(CodecError::UnexpectedType {
                role: "controller",
                found: other.kind(),
            }),
        }
    }
}

impl DeviceReport {
    /// Decode a frame received from the device registered as `device_id`,
    /// filling in the device id and media type where they were left out.
    pub fn from_device(bytes: &[u8], device_id: &str) -> Result<Self, CodecError> {
        match Frame::decode(bytes)? {
            Frame::Status(mut status) => {
                if status.device_id.is_empty() {
                    status.device_id = device_id.to_string();
                }
                status.detail = non_empty(status.detail);
                Ok(DeviceReport::Status(status))
            }
            Frame::Image(mut image) => {
                if image.device_id.is_empty() {
                    image.device_id = device_id.to_string();
                }
                image.mime = non_empty(image.mime).or_else(|| Some(DEFAULT_IMAGE_MIME.to_string()));
                Ok(DeviceReport::Image(image))
            }
            other => Err(CodecError::UnexpectedType {
                role: "device",
                found: other.kind(),
            }),
        }
    }
}

/// Errors raised while decoding or encoding a frame
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("unknown frame type: {0}")]
    UnknownType(String),

    #[error("{role} may not send {found} frames")]
    UnexpectedType {
        role: &'static str,
        found: &'static str,
    },
}
