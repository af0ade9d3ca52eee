//! Error types for the room layer.
//!
//! The display strings are what clients see in `error` events.

use matchforge_protocol::RoomId;

/// Reasons a matchmaking request is refused. All are caller errors.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The caller already occupies a room.
    #[error("Already in a room. Leave first.")]
    AlreadyInRoom(RoomId),

    /// `activityId` was missing or not a string.
    #[error("activityId is required.")]
    InvalidActivity,

    /// No registered room has this id (or no id was given).
    #[error("Room not found.")]
    NotFound(Option<RoomId>),

    /// The room exists but is not accepting members.
    #[error("Room is not accepting players.")]
    NotWaiting(RoomId),

    /// Every seat is taken.
    #[error("Room is full.")]
    RoomFull(RoomId),

    /// The caller has no current room.
    #[error("Not in a room.")]
    NotInRoom,
}
