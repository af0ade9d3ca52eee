//! Error types for the session layer.

use matchforge_protocol::{ConnectionId, RoomId};

/// Errors raised by the player registry and the sanitizer.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No player is registered for this connection.
    #[error("no player registered for {0}")]
    NotFound(ConnectionId),

    /// The connection already has a player record.
    #[error("{0} is already registered")]
    AlreadyRegistered(ConnectionId),

    /// The player must leave their room before the record can go.
    #[error("{0} is still seated in room {1}")]
    StillInRoom(ConnectionId, RoomId),

    /// An application message exceeded the relay size bound.
    #[error("Message too large.")]
    PayloadTooLarge { size: usize, max: usize },
}
