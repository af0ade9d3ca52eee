//! Rooms for Matchforge.
//!
//! A room is a bounded group of connections gathered for one activity.
//! This crate owns the room record and its status transitions; the
//! matchmaker decides who goes where and when timers fire.
//!
//! # Key types
//!
//! - [`Room`]: membership, capacity, host, and status of one room
//! - [`RoomRegistry`]: every registered room, in creation order
//! - [`RoomConfig`]: capacities, id length, and lifecycle delays
//! - [`generate_room_id`]: short ids that don't collide with live rooms

mod config;
mod error;
mod id;
mod registry;
mod room;

pub use config::RoomConfig;
pub use error::RoomError;
pub use id::{ROOM_ID_ALPHABET, generate_room_id, generate_room_id_with};
pub use matchforge_protocol::RoomStatus;
pub use registry::RoomRegistry;
pub use room::{Departure, Room};
