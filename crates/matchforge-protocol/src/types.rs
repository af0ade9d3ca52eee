//! Wire types for the matchmaker.
//!
//! Every frame is JSON. A client frame looks like
//!
//! ```text
//! { "ack": 3, "event": { "type": "create-room", "data": { "activityId": "duel" } } }
//! ```
//!
//! and a server frame has the same outer shape, with `ack` echoed back on
//! the direct reply to a request that carried one.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::ConnectionId;

/// Opaque key/value settings attached to a room. Never interpreted.
pub type Settings = Map<String, Value>;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A short, human-shareable room identifier (e.g. `"k3x9qa"`).
///
/// Unique among the rooms currently registered; an id may come back once
/// the room that held it has been destroyed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Wraps a raw id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One seat in a room: who occupies it and the name they had when they sat down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    pub connection_id: ConnectionId,
    pub display_name: String,
}

// ---------------------------------------------------------------------------
// Room status and snapshots
// ---------------------------------------------------------------------------

/// The stored lifecycle status of a room.
///
/// ```text
/// Waiting ──(last member leaves)──→ CleanupPending ──(timer)──→ destroyed
///    ↑                                    │
///    └──────────(rejoin before timer)─────┘
/// ```
///
/// Destruction is terminal and not a stored state: a destroyed room is
/// simply absent from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoomStatus {
    /// Accepting members and eligible for quick-play.
    Waiting,
    /// Empty and waiting out the grace period before destruction.
    CleanupPending,
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => f.write_str("waiting"),
            Self::CleanupPending => f.write_str("cleanup-pending"),
        }
    }
}

/// Full, self-contained view of a room as sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub activity_id: String,
    pub players: Vec<MemberInfo>,
    pub max_players: usize,
    pub status: RoomStatus,
    pub settings: Settings,
    /// Creation time in milliseconds since the Unix epoch.
    pub created: u64,
    /// `None` only while the room is empty.
    pub host_id: Option<ConnectionId>,
    pub player_count: usize,
}

/// Why a room stopped existing for a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    /// The waiting timeout fired before the room moved on.
    #[serde(rename = "timeout")]
    Timeout,
    /// The cleanup grace period ended with the room still empty.
    #[serde(rename = "empty")]
    Empty,
    /// The client asked to leave.
    #[serde(rename = "you left")]
    YouLeft,
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Events a client can send.
///
/// Fields that come straight from untrusted input (`name`, `activityId`,
/// `maxPlayers`, `settings`, `roomId`) are kept as raw [`Value`]s, so a
/// field of the wrong JSON type fails its request with a matchmaking
/// error instead of failing the whole frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    SetName {
        #[serde(default)]
        name: Option<Value>,
    },
    CreateRoom {
        #[serde(default)]
        activity_id: Option<Value>,
        #[serde(default)]
        max_players: Option<Value>,
        #[serde(default)]
        settings: Option<Value>,
    },
    JoinRoom {
        #[serde(default)]
        room_id: Option<Value>,
    },
    QuickPlay {
        #[serde(default)]
        activity_id: Option<Value>,
    },
    LeaveRoom {},
    ListRooms {
        #[serde(default)]
        activity_id: Option<Value>,
    },
    RoomMessage {
        #[serde(rename = "type", default)]
        kind: Value,
        #[serde(default)]
        data: Value,
    },
}

impl ClientEvent {
    /// The wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetName { .. } => "set-name",
            Self::CreateRoom { .. } => "create-room",
            Self::JoinRoom { .. } => "join-room",
            Self::QuickPlay { .. } => "quick-play",
            Self::LeaveRoom {} => "leave-room",
            Self::ListRooms { .. } => "list-rooms",
            Self::RoomMessage { .. } => "room-message",
        }
    }
}

/// A client frame: an event plus an optional acknowledgement id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inbound {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
    #[serde(deserialize_with = "lenient_event")]
    pub event: ClientEvent,
}

impl Inbound {
    /// A frame without an acknowledgement id.
    pub fn new(event: ClientEvent) -> Self {
        Self { ack: None, event }
    }

    /// A frame asking for a synchronous reply tagged with `ack`.
    pub fn with_ack(ack: u64, event: ClientEvent) -> Self {
        Self {
            ack: Some(ack),
            event,
        }
    }
}

/// Accepts `data` omitted or `null` as an empty payload.
fn lenient_event<'de, D>(deserializer: D) -> Result<ClientEvent, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct RawEvent {
        #[serde(rename = "type")]
        name: String,
        #[serde(default)]
        data: Value,
    }

    let raw = RawEvent::deserialize(deserializer)?;
    let data = match raw.data {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    let mut tagged = Map::new();
    tagged.insert("type".into(), Value::String(raw.name));
    tagged.insert("data".into(), data);
    serde_json::from_value(Value::Object(tagged)).map_err(serde::de::Error::custom)
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Events the matchmaker sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Sent once, right after the connection is registered.
    Connected { connection_id: ConnectionId },
    /// Full snapshot to the client that just entered a room.
    RoomJoined(RoomSnapshot),
    /// Full snapshot to every member after a membership change.
    RoomUpdated(RoomSnapshot),
    /// Someone took a seat.
    PlayerJoined(MemberInfo),
    /// Someone left their seat.
    PlayerLeft(MemberInfo),
    /// The room is gone for this client.
    RoomClosed {
        room_id: Option<RoomId>,
        reason: CloseReason,
    },
    /// An application message relayed from another member.
    RoomMessage {
        from: MemberInfo,
        #[serde(rename = "type")]
        kind: Value,
        data: Value,
    },
    /// Rooms currently open for joining.
    RoomList { rooms: Vec<RoomSnapshot> },
    /// A request failed. Always recoverable.
    Error { message: String },
}

/// A server frame. `ack` is set only on the direct reply to a request
/// that carried one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outbound {
    #[serde(default)]
    pub ack: Option<u64>,
    pub event: ServerEvent,
}

impl Outbound {
    /// An unsolicited event.
    pub fn event(event: ServerEvent) -> Self {
        Self { ack: None, event }
    }

    /// A reply to the request tagged `ack` (or a plain event when `None`).
    pub fn reply(ack: Option<u64>, event: ServerEvent) -> Self {
        Self { ack, event }
    }
}
