//! Error types for inbound signaling frames.

use thiserror::Error;

/// Why an inbound frame could not be turned into a [`ClientMessage`](crate::protocol::ClientMessage).
///
/// None of these close the connection; the frame is logged and dropped.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Not JSON, not an object, unknown `type`, or missing a required field.
    #[error("Invalid message: {0}")]
    Json(#[from] serde_json::Error),

    /// `join` with an empty room identifier.
    #[error("Join without a room")]
    EmptyRoom,

    /// Binary frame that is not UTF-8.
    #[error("Frame is not UTF-8 text")]
    NotText,
}
