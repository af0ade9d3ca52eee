//! Errors from the transport layer.

use std::net::SocketAddr;

use crate::ConnectionId;

/// Why a socket operation failed.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listener could not be bound.
    #[error("could not bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// The WebSocket upgrade was refused (wrong path, bad handshake).
    #[error("upgrade rejected: {0}")]
    UpgradeRejected(String),

    /// The peer did not finish the upgrade in time.
    #[error("handshake with {peer} timed out")]
    HandshakeTimedOut { peer: SocketAddr },

    /// Writing a frame failed; the peer is most likely gone.
    #[error("send to {connection_id} failed: {reason}")]
    Send {
        connection_id: ConnectionId,
        reason: String,
    },

    /// Reading a frame failed.
    #[error("receive from {connection_id} failed: {reason}")]
    Receive {
        connection_id: ConnectionId,
        reason: String,
    },
}
