//! Room id generation.

use matchforge_protocol::RoomId;
use rand::Rng;

use crate::RoomRegistry;

/// Symbols room ids are drawn from: lowercase letters and digits.
pub const ROOM_ID_ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Draws a `len`-character id that no currently registered room uses.
pub fn generate_room_id(rooms: &RoomRegistry, len: usize) -> RoomId {
    generate_room_id_with(rooms, len, &mut rand::rng())
}

/// Same as [`generate_room_id`], with a caller-supplied random source.
///
/// Retries until the candidate is free. The registry must not change
/// between this call and inserting the room under the returned id.
pub fn generate_room_id_with<R: Rng + ?Sized>(
    rooms: &RoomRegistry,
    len: usize,
    rng: &mut R,
) -> RoomId {
    loop {
        let candidate: String = (0..len)
            .map(|_| ROOM_ID_ALPHABET[rng.random_range(0..ROOM_ID_ALPHABET.len())] as char)
            .collect();
        let candidate = RoomId::new(candidate);
        if !rooms.contains(&candidate) {
            return candidate;
        }
        tracing::trace!(%candidate, "room id collision, retrying");
    }
}
