//! Wire protocol: JSON objects discriminated by their `type` field.
//!
//! Negotiation payloads (`offer`, `answer`, `ice-candidate`) are never
//! interpreted. The router only needs their type to decide they are relayable;
//! the original frame text is forwarded untouched.

use crate::error::ProtocolError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Opaque room identifier chosen by the clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Device class a client declares on `join`, usually `mobile` or `desktop`.
///
/// Opaque to the server: whatever string the client sends is echoed back in
/// presence messages. A missing, empty or non-string value reads as `unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DeviceClass(String);

impl DeviceClass {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn new(class: impl Into<String>) -> Self {
        let class = class.into();
        if class.is_empty() {
            Self::default()
        } else {
            Self(class)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DeviceClass {
    fn default() -> Self {
        Self(Self::UNKNOWN.to_owned())
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DeviceClass {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(class) => Self::new(class),
            _ => Self::default(),
        })
    }
}

/// Client → Server messages.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Application keepalive, answered with `pong`.
    Ping,

    /// Enter (or switch to) a room.
    Join {
        room: RoomId,
        #[serde(rename = "deviceType", default)]
        device_type: DeviceClass,
    },

    /// Session description offer. `room` is informational; the sender's
    /// current room decides where it goes.
    Offer { room: Option<RoomId> },

    /// Session description answer.
    Answer { room: Option<RoomId> },

    /// Connectivity candidate.
    IceCandidate { room: Option<RoomId> },
}

impl ClientMessage {
    /// Wire name of the message type.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Join { .. } => "join",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::IceCandidate { .. } => "ice-candidate",
        }
    }

    /// Room named inside a relayable message, if any.
    pub fn claimed_room(&self) -> Option<&RoomId> {
        match self {
            Self::Offer { room } | Self::Answer { room } | Self::IceCandidate { room } => {
                room.as_ref()
            }
            _ => None,
        }
    }
}

/// A parsed inbound frame together with the text it came from, so relayable
/// messages can be forwarded byte for byte.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub message: ClientMessage,
    pub raw: Arc<str>,
}

impl Inbound {
    /// Parse a text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let message: ClientMessage = serde_json::from_str(text)?;
        if let ClientMessage::Join { room, .. } = &message {
            if room.as_str().is_empty() {
                return Err(ProtocolError::EmptyRoom);
            }
        }
        Ok(Self {
            message,
            raw: Arc::from(text),
        })
    }

    /// Parse a binary frame carrying UTF-8 JSON.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::NotText)?;
        Self::parse(text)
    }
}

/// Server → Client messages generated by the server itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Reply to the joining connection.
    Joined {
        room: RoomId,
        count: usize,
        initiator: bool,
        /// Device classes of the other members.
        #[serde(rename = "peerTypes")]
        peer_types: Vec<DeviceClass>,
    },

    /// Membership snapshot sent to every member after a change.
    RoomUpdate {
        room: RoomId,
        count: usize,
        devices: Vec<DeviceClass>,
    },

    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn join_defaults_device_type() {
        let inbound = Inbound::parse(r#"{"type":"join","room":"abc"}"#).unwrap();
        assert_eq!(
            inbound.message,
            ClientMessage::Join {
                room: RoomId::new("abc"),
                device_type: DeviceClass::default(),
            }
        );
    }

    fn device_type_of(text: &str) -> DeviceClass {
        match Inbound::parse(text).unwrap().message {
            ClientMessage::Join { device_type, .. } => device_type,
            other => panic!("expected join, got {other:?}"),
        }
    }

    #[test]
    fn device_type_is_kept_as_sent() {
        let class = device_type_of(r#"{"type":"join","room":"abc","deviceType":"tablet"}"#);
        assert_eq!(class.as_str(), "tablet");
        assert_eq!(serde_json::to_value(&class).unwrap(), json!("tablet"));
    }

    #[test]
    fn unusable_device_type_reads_as_unknown() {
        for text in [
            r#"{"type":"join","room":"abc","deviceType":5}"#,
            r#"{"type":"join","room":"abc","deviceType":null}"#,
            r#"{"type":"join","room":"abc","deviceType":""}"#,
            r#"{"type":"join","room":"abc","deviceType":{"os":"ios"}}"#,
        ] {
            assert_eq!(device_type_of(text).as_str(), DeviceClass::UNKNOWN, "{text}");
        }
    }

    #[test]
    fn relayable_messages_keep_raw_frame() {
        let text = r#"{"type":"offer","room":"abc","offer":{"type":"offer","sdp":"v=0"},"n":123456789012345678901234567890}"#;
        let inbound = Inbound::parse(text).unwrap();
        assert_eq!(inbound.message.kind(), "offer");
        assert_eq!(inbound.message.claimed_room(), Some(&RoomId::new("abc")));
        assert_eq!(&*inbound.raw, text);
    }

    #[test]
    fn candidate_without_room_still_parses() {
        let inbound =
            Inbound::parse(r#"{"type":"ice-candidate","candidate":{"candidate":"x"}}"#).unwrap();
        assert_eq!(inbound.message, ClientMessage::IceCandidate { room: None });
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(matches!(Inbound::parse("not json"), Err(ProtocolError::Json(_))));
        assert!(matches!(
            Inbound::parse(r#"{"type":"teleport"}"#),
            Err(ProtocolError::Json(_))
        ));
        assert!(matches!(
            Inbound::parse(r#"{"type":"join"}"#),
            Err(ProtocolError::Json(_))
        ));
        assert!(matches!(
            Inbound::parse(r#"{"type":"join","room":""}"#),
            Err(ProtocolError::EmptyRoom)
        ));
        assert!(matches!(
            Inbound::parse_bytes(&[0xff, 0xfe]),
            Err(ProtocolError::NotText)
        ));
    }

    #[test]
    fn server_messages_use_client_field_names() {
        let joined = ServerMessage::Joined {
            room: RoomId::new("abc"),
            count: 2,
            initiator: false,
            peer_types: vec![DeviceClass::new("mobile")],
        };
        assert_eq!(
            serde_json::to_value(&joined).unwrap(),
            json!({"type":"joined","room":"abc","count":2,"initiator":false,"peerTypes":["mobile"]})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::Pong).unwrap(),
            json!({"type":"pong"})
        );
        let update = ServerMessage::RoomUpdate {
            room: RoomId::new("abc"),
            count: 1,
            devices: vec![DeviceClass::new("desktop")],
        };
        assert_eq!(serde_json::to_value(&update).unwrap()["type"], "room-update");
    }
}
