//! Unified error type for Matchforge.

use matchforge_protocol::ProtocolError;
use matchforge_room::RoomError;
use matchforge_session::SessionError;
use matchforge_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Matchmaking operations return this type, so a caller error from either
/// the room or the session layer reaches the client through one path. The
/// display string of a wrapped error is passed through unchanged: it is
/// the `message` of the `error` event.
#[derive(Debug, thiserror::Error)]
pub enum MatchforgeError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, non-text frame).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (unknown connection, oversized message).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A matchmaking refusal (full, not found, not waiting, ...).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The coordinator task is no longer running.
    #[error("coordinator stopped")]
    CoordinatorStopped,
}

#[cfg(test)]
mod tests {
    use matchforge_protocol::{ConnectionId, RoomId};

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::UpgradeRejected("no endpoint at /x".into());
        let matchforge_err: MatchforgeError = err.into();
        assert!(matches!(matchforge_err, MatchforgeError::Transport(_)));
        assert!(matchforge_err.to_string().contains("/x"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::NotText(String::from_utf8(vec![0xff]).unwrap_err());
        let matchforge_err: MatchforgeError = err.into();
        assert!(matches!(matchforge_err, MatchforgeError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::NotFound(ConnectionId::new(1));
        let matchforge_err: MatchforgeError = err.into();
        assert!(matches!(matchforge_err, MatchforgeError::Session(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::RoomFull(RoomId::new("abc123"));
        let matchforge_err: MatchforgeError = err.into();
        assert!(matches!(matchforge_err, MatchforgeError::Room(_)));
    }

    #[test]
    fn test_client_messages_pass_through() {
        let full: MatchforgeError = RoomError::RoomFull(RoomId::new("abc123")).into();
        assert_eq!(full.to_string(), "Room is full.");

        let big: MatchforgeError = SessionError::PayloadTooLarge { size: 5000, max: 4096 }.into();
        assert_eq!(big.to_string(), "Message too large.");
    }
}
