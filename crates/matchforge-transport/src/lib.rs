//! Network edge of Matchforge.
//!
//! The matchmaker needs a handful of things from a socket: accept it,
//! finish its handshake, write text frames, read frames, probe whether the
//! peer is still there, and learn when it closed. [`Transport`],
//! [`Upgrade`] and [`Connection`] are that surface, so nothing above this
//! crate handles sockets.
//!
//! Accepting and upgrading are separate steps. The listener hands out an
//! [`Upgrade`] as soon as TCP is accepted, and the caller runs the
//! handshake on its own task under whatever time limit it chooses.
//!
//! # Feature Flags
//!
//! - `websocket` (default): [`WebSocketTransport`] on `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport, WebSocketUpgrade};

use std::fmt;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Process-unique id of an accepted connection.
///
/// Keys the player registry and is shown to clients as `connectionId`.
/// Serialized as a bare number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A listener that yields connections.
pub trait Transport: Send + Sync + 'static {
    type Upgrade: Upgrade<Connection = Self::Connection, Error = Self::Error>;
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next client. Returns before its handshake starts.
    async fn accept(&mut self) -> Result<Self::Upgrade, Self::Error>;
}

/// An accepted socket whose handshake has not run yet.
pub trait Upgrade: Send + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    fn peer_addr(&self) -> SocketAddr;

    /// Runs the handshake. Waits as long as the peer does.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;
}

/// What [`Connection::recv`] read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// Payload of a text or binary frame.
    Data(Vec<u8>),
    /// A ping or pong. The peer is alive but sent nothing to act on.
    Heartbeat,
}

/// One client socket.
///
/// `send_text` must be usable from one task while another is parked in
/// `recv`: each connection has a reader loop and a separate writer task.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Writes one text frame.
    async fn send_text(&self, text: &str) -> Result<(), Self::Error>;

    /// Reads the next frame.
    ///
    /// `Ok(None)` means the peer closed cleanly.
    async fn recv(&self) -> Result<Option<Received>, Self::Error>;

    /// Sends a ping. The peer's pong arrives as [`Received::Heartbeat`].
    async fn ping(&self) -> Result<(), Self::Error>;

    /// Starts a close handshake.
    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}
