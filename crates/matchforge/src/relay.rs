//! Fan-out of room events to members.
//!
//! These helpers take the player registry and the room separately so the
//! matchmaker can hold a mutable borrow of one registry while notifying
//! through the other.

use matchforge_protocol::{ConnectionId, Outbound, ServerEvent};
use matchforge_room::Room;
use matchforge_session::PlayerRegistry;

/// Sends `event` to every member of `room` except `subject`.
///
/// With `subject` of `None` every member receives it. Returns the number
/// of members the event was queued for.
pub fn broadcast_membership_change(
    players: &PlayerRegistry,
    room: &Room,
    event: ServerEvent,
    subject: Option<ConnectionId>,
) -> usize {
    let mut recipients = 0;
    for member in room.members() {
        if Some(member.connection_id) == subject {
            continue;
        }
        players.send(member.connection_id, Outbound::event(event.clone()));
        recipients += 1;
    }
    recipients
}

/// Sends a fresh `room-updated` snapshot to every member.
pub fn broadcast_room_update(players: &PlayerRegistry, room: &Room) {
    let snapshot = room.snapshot();
    broadcast_membership_change(players, room, ServerEvent::RoomUpdated(snapshot), None);
}
