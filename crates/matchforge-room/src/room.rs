//! The room record and its membership state machine.

use std::time::{SystemTime, UNIX_EPOCH};

use matchforge_protocol::{
    ConnectionId, MemberInfo, RoomId, RoomSnapshot, RoomStatus, Settings,
};

use crate::RoomError;

/// What happened when a member was removed.
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    /// The seat that was vacated.
    pub member: MemberInfo,
    /// The new host, when the departing member was the host and others remain.
    pub new_host: Option<ConnectionId>,
    /// The room just became empty and moved to `cleanup-pending`.
    pub emptied: bool,
}

/// One matchmaking group.
///
/// Invariants held by every method:
/// - `members.len() <= max_players`, with no duplicate connections
/// - `host_id` is a current member whenever the room is non-empty
/// - an empty room is `CleanupPending`
#[derive(Debug, Clone)]
pub struct Room {
    room_id: RoomId,
    activity_id: String,
    members: Vec<MemberInfo>,
    max_players: usize,
    status: RoomStatus,
    settings: Settings,
    host_id: Option<ConnectionId>,
    created_ms: u64,
    /// Who emptied the room; only they may bring it back during cleanup.
    last_departed: Option<ConnectionId>,
}

impl Room {
    /// Creates a `waiting` room with `host` as its only member.
    pub fn new(
        room_id: RoomId,
        activity_id: impl Into<String>,
        host: MemberInfo,
        max_players: usize,
        settings: Settings,
    ) -> Self {
        let created_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            room_id,
            activity_id: activity_id.into(),
            host_id: Some(host.connection_id),
            members: vec![host],
            max_players: max_players.max(1),
            status: RoomStatus::Waiting,
            settings,
            created_ms,
            last_departed: None,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn activity_id(&self) -> &str {
        &self.activity_id
    }

    pub fn members(&self) -> &[MemberInfo] {
        &self.members
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn host_id(&self) -> Option<ConnectionId> {
        self.host_id
    }

    pub fn player_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.max_players
    }

    pub fn has_member(&self, connection_id: ConnectionId) -> bool {
        self.members.iter().any(|m| m.connection_id == connection_id)
    }

    /// `true` if quick-play and the room list may offer this room.
    ///
    /// `activity` of `None` matches any activity.
    pub fn is_open_for(&self, activity: Option<&str>) -> bool {
        self.status == RoomStatus::Waiting
            && !self.is_full()
            && activity.is_none_or(|a| a == self.activity_id)
    }

    /// Seats a new member.
    ///
    /// A `cleanup-pending` room only takes back the connection that emptied
    /// it, which returns the room to `waiting` with that connection as host.
    pub fn add_member(&mut self, member: MemberInfo) -> Result<(), RoomError> {
        if self.has_member(member.connection_id) {
            return Err(RoomError::AlreadyInRoom(self.room_id.clone()));
        }
        match self.status {
            RoomStatus::Waiting => {
                if self.is_full() {
                    return Err(RoomError::RoomFull(self.room_id.clone()));
                }
            }
            RoomStatus::CleanupPending => {
                if self.last_departed != Some(member.connection_id) {
                    return Err(RoomError::NotWaiting(self.room_id.clone()));
                }
                tracing::debug!(
                    room_id = %self.room_id,
                    connection_id = %member.connection_id,
                    "room revived before cleanup"
                );
                self.status = RoomStatus::Waiting;
                self.last_departed = None;
            }
        }

        if self.host_id.is_none() {
            self.host_id = Some(member.connection_id);
        }
        self.members.push(member);
        Ok(())
    }

    /// Vacates a member's seat, reassigning the host or starting cleanup.
    ///
    /// Returns `None` if the connection was not seated here.
    pub fn remove_member(&mut self, connection_id: ConnectionId) -> Option<Departure> {
        let index = self
            .members
            .iter()
            .position(|m| m.connection_id == connection_id)?;
        let member = self.members.remove(index);

        if self.members.is_empty() {
            self.status = RoomStatus::CleanupPending;
            self.host_id = None;
            self.last_departed = Some(connection_id);
            return Some(Departure {
                member,
                new_host: None,
                emptied: true,
            });
        }

        let mut new_host = None;
        if self.host_id == Some(connection_id) {
            let first = self.members[0].connection_id;
            self.host_id = Some(first);
            new_host = Some(first);
        }
        Some(Departure {
            member,
            new_host,
            emptied: false,
        })
    }

    /// A self-contained copy of the room for clients.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.room_id.clone(),
            activity_id: self.activity_id.clone(),
            players: self.members.clone(),
            max_players: self.max_players,
            status: self.status,
            settings: self.settings.clone(),
            created: self.created_ms,
            host_id: self.host_id,
            player_count: self.members.len(),
        }
    }
}
