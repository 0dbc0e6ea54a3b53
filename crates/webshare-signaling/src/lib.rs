//! # webshare-signaling
//!
//! Rendezvous and session negotiation relay for browser-to-browser file transfer.
//!
//! Clients meet in a room by sharing its identifier, exchange session
//! descriptions and connectivity candidates through this server, and are told
//! when peers arrive or leave. File bytes never pass through here; they flow
//! over the peer-to-peer channel the clients negotiate.
//!
//! Components:
//! - [`registry`]: live connections, device classes, liveness
//! - [`rooms`]: room membership and emptiness cleanup
//! - [`hub`]: message routing and the single lock serializing membership changes
//! - `presence`: `room-update` snapshots
//! - [`keepalive`]: periodic probing and reclaim
//! - [`handler`]: the WebSocket endpoint

#![forbid(unsafe_code)]

pub mod error;
pub mod handler;
pub mod hub;
pub mod keepalive;
mod presence;
pub mod protocol;
pub mod registry;
pub mod rooms;

pub use error::ProtocolError;
pub use handler::build_router;
pub use hub::{HubStats, SignalingHub};
pub use protocol::{ClientMessage, DeviceClass, RoomId, ServerMessage};
pub use registry::{ConnectionId, Outbound};
