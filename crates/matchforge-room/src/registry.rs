//! The room registry: every registered room, in creation order.
//!
//! Iteration order is creation order, which is what makes quick-play's
//! first-fit scan deterministic. Not thread-safe by itself; the registry
//! is owned by the coordinator task.

use std::collections::HashMap;

use matchforge_protocol::{RoomId, RoomSnapshot};

use crate::Room;

/// Exclusive owner of all [`Room`] records.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, Room>,
    /// Creation order of the keys in `rooms`.
    order: Vec<RoomId>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a room under its id, replacing nothing.
    ///
    /// Returns `false` (and drops `room`) if the id is already taken.
    pub fn insert(&mut self, room: Room) -> bool {
        let room_id = room.room_id().clone();
        if self.rooms.contains_key(&room_id) {
            tracing::warn!(%room_id, "refusing to register duplicate room id");
            return false;
        }
        self.order.push(room_id.clone());
        self.rooms.insert(room_id, room);
        true
    }

    /// Destroys a room, returning its final record.
    pub fn remove(&mut self, room_id: &RoomId) -> Option<Room> {
        let room = self.rooms.remove(room_id)?;
        self.order.retain(|id| id != room_id);
        Some(room)
    }

    pub fn get(&self, room_id: &RoomId) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn get_mut(&mut self, room_id: &RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Rooms in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.order.iter().filter_map(|id| self.rooms.get(id))
    }

    /// First room, in creation order, that quick-play may join.
    ///
    /// Deliberately first-fit: the earliest open room wins even if a
    /// fuller one exists.
    pub fn find_open(&self, activity: Option<&str>) -> Option<&RoomId> {
        self.iter()
            .find(|room| room.is_open_for(activity))
            .map(Room::room_id)
    }

    /// Snapshots of every room open for joining, optionally for one activity.
    pub fn list_open(&self, activity: Option<&str>) -> Vec<RoomSnapshot> {
        self.iter()
            .filter(|room| room.is_open_for(activity))
            .map(Room::snapshot)
            .collect()
    }

    /// Snapshots of every registered room, whatever its status.
    pub fn snapshots(&self) -> Vec<RoomSnapshot> {
        self.iter().map(Room::snapshot).collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
