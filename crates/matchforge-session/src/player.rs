//! Player records: the server's view of one live connection.

use std::time::Duration;

use matchforge_protocol::{ConnectionId, MemberInfo, Outbound, RoomId};
use tokio::sync::mpsc;

use crate::DEFAULT_NAME;

/// Channel for delivering outbound frames to a connection's writer task.
pub type PlayerSender = mpsc::UnboundedSender<Outbound>;

/// Limits applied to untrusted clients and their connections.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Longest display name kept after sanitizing.
    pub max_name_len: usize,
    /// Largest encoded `{type, data}` body the relay forwards, in bytes.
    pub max_message_bytes: usize,
    /// How long a new socket gets to finish the WebSocket upgrade.
    pub handshake_timeout: Duration,
    /// How often the server pings each connection.
    pub ping_interval: Duration,
    /// A connection that sends nothing, pongs included, for this long is
    /// treated as disconnected.
    pub idle_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_name_len: 20,
            max_message_bytes: 4096,
            handshake_timeout: Duration::from_secs(5),
            ping_interval: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(20),
        }
    }
}

impl SessionConfig {
    const MIN_PING_INTERVAL: Duration = Duration::from_millis(10);

    /// Clamps the connection timings into a usable range.
    ///
    /// The idle timeout is raised to at least two ping intervals.
    pub fn validated(mut self) -> Self {
        if self.ping_interval < Self::MIN_PING_INTERVAL {
            tracing::warn!(
                ping_interval = ?self.ping_interval,
                "ping_interval too short, raising"
            );
            self.ping_interval = Self::MIN_PING_INTERVAL;
        }
        let floor = self.ping_interval * 2;
        if self.idle_timeout < floor {
            tracing::warn!(
                idle_timeout = ?self.idle_timeout,
                floor = ?floor,
                "idle_timeout shorter than two pings, raising"
            );
            self.idle_timeout = floor;
        }
        self
    }
}

/// One connected client.
///
/// Created when the connection is accepted and removed when it closes.
/// `current_room` is a non-owning reference: the room registry owns the
/// room itself.
#[derive(Debug, Clone)]
pub struct Player {
    /// Registry key, assigned by the transport.
    pub connection_id: ConnectionId,
    /// Sanitized display name.
    pub display_name: String,
    /// The room this player currently sits in, if any.
    pub current_room: Option<RoomId>,
    sender: PlayerSender,
}

impl Player {
    pub(crate) fn new(connection_id: ConnectionId, sender: PlayerSender) -> Self {
        Self {
            connection_id,
            display_name: DEFAULT_NAME.to_string(),
            current_room: None,
            sender,
        }
    }

    /// This player's seat description, as shown to other members.
    pub fn member_info(&self) -> MemberInfo {
        MemberInfo {
            connection_id: self.connection_id,
            display_name: self.display_name.clone(),
        }
    }

    /// Queues a frame for this player. Dropped silently if the writer is gone.
    pub fn send(&self, frame: Outbound) {
        if self.sender.send(frame).is_err() {
            tracing::trace!(
                connection_id = %self.connection_id,
                "outbound channel closed, dropping frame"
            );
        }
    }
}
