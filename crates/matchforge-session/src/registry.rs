//! The player registry: every live connection and its session record.
//!
//! Like the room registry, this is a plain `HashMap` with no locking. It
//! is owned by the single coordinator task and never shared.

use std::collections::HashMap;

use matchforge_protocol::{ConnectionId, Outbound, RoomId};
use serde_json::Value;

use crate::{Player, PlayerSender, SessionConfig, SessionError, sanitize_name};

/// Maps each live connection to its [`Player`].
#[derive(Debug)]
pub struct PlayerRegistry {
    players: HashMap<ConnectionId, Player>,
    config: SessionConfig,
}

impl PlayerRegistry {
    /// Creates an empty registry.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            players: HashMap::new(),
            config,
        }
    }

    /// Input limits in effect.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Registers a freshly accepted connection with the default name and no room.
    pub fn register(
        &mut self,
        connection_id: ConnectionId,
        sender: PlayerSender,
    ) -> Result<&Player, SessionError> {
        if self.players.contains_key(&connection_id) {
            return Err(SessionError::AlreadyRegistered(connection_id));
        }
        let player = self
            .players
            .entry(connection_id)
            .or_insert_with(|| Player::new(connection_id, sender));
        tracing::debug!(%connection_id, "player registered");
        Ok(player)
    }

    /// Sanitizes and applies a display name. Unknown connections are ignored.
    ///
    /// Returns the name that was stored.
    pub fn set_name(
        &mut self,
        connection_id: ConnectionId,
        raw: Option<&Value>,
    ) -> Option<&str> {
        let max_len = self.config.max_name_len;
        let player = self.players.get_mut(&connection_id)?;
        player.display_name = sanitize_name(raw, max_len);
        Some(&player.display_name)
    }

    /// Records which room a player sits in (or `None` after leaving).
    pub fn set_room(
        &mut self,
        connection_id: ConnectionId,
        room: Option<RoomId>,
    ) -> Result<(), SessionError> {
        let player = self
            .players
            .get_mut(&connection_id)
            .ok_or(SessionError::NotFound(connection_id))?;
        player.current_room = room;
        Ok(())
    }

    /// Clears a player's seat and returns the room it was in.
    ///
    /// `None` if the player sat nowhere or is not registered.
    pub fn vacate(&mut self, connection_id: ConnectionId) -> Option<RoomId> {
        self.players.get_mut(&connection_id)?.current_room.take()
    }

    /// Removes a player record.
    ///
    /// The player must already have been taken out of their room, so no
    /// record anywhere is left pointing at a stale seat.
    pub fn unregister(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<Player, SessionError> {
        let player = self
            .players
            .get(&connection_id)
            .ok_or(SessionError::NotFound(connection_id))?;
        if let Some(room_id) = &player.current_room {
            return Err(SessionError::StillInRoom(connection_id, room_id.clone()));
        }
        let player = self
            .players
            .remove(&connection_id)
            .ok_or(SessionError::NotFound(connection_id))?;
        tracing::debug!(%connection_id, "player unregistered");
        Ok(player)
    }

    /// Queues a frame for one connection. Unknown connections are ignored.
    pub fn send(&self, connection_id: ConnectionId, frame: Outbound) {
        if let Some(player) = self.players.get(&connection_id) {
            player.send(frame);
        }
    }

    pub fn get(&self, connection_id: &ConnectionId) -> Option<&Player> {
        self.players.get(connection_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use matchforge_protocol::ServerEvent;
    use serde_json::json;
    use tokio::sync::mpsc;

    use super::*;
    use crate::DEFAULT_NAME;

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn dummy_sender() -> PlayerSender {
        mpsc::unbounded_channel().0
    }

    #[test]
    fn test_register_creates_default_record() {
        let mut reg = PlayerRegistry::default();
        let player = reg.register(cid(1), dummy_sender()).unwrap();

        assert_eq!(player.connection_id, cid(1));
        assert_eq!(player.display_name, DEFAULT_NAME);
        assert!(player.current_room.is_none());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_register_twice_is_rejected() {
        let mut reg = PlayerRegistry::default();
        reg.register(cid(1), dummy_sender()).unwrap();

        let result = reg.register(cid(1), dummy_sender());
        assert!(matches!(result, Err(SessionError::AlreadyRegistered(c)) if c == cid(1)));
    }

    #[test]
    fn test_set_name_sanitizes() {
        let mut reg = PlayerRegistry::default();
        reg.register(cid(1), dummy_sender()).unwrap();

        let stored = reg.set_name(cid(1), Some(&json!("  R0b<script>  "))).map(str::to_string);
        assert_eq!(stored.as_deref(), Some("R0bscript"));
        assert_eq!(reg.get(&cid(1)).unwrap().display_name, "R0bscript");
    }

    #[test]
    fn test_set_name_respects_configured_length() {
        let mut reg = PlayerRegistry::new(SessionConfig {
            max_name_len: 4,
            ..SessionConfig::default()
        });
        reg.register(cid(1), dummy_sender()).unwrap();
        reg.set_name(cid(1), Some(&json!("abcdefgh")));
        assert_eq!(reg.get(&cid(1)).unwrap().display_name, "abcd");
    }

    #[test]
    fn test_set_name_unknown_connection_is_noop() {
        let mut reg = PlayerRegistry::default();
        assert!(reg.set_name(cid(9), Some(&json!("ghost"))).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_unregister_requires_leaving_room_first() {
        let mut reg = PlayerRegistry::default();
        reg.register(cid(1), dummy_sender()).unwrap();
        reg.set_room(cid(1), Some(RoomId::new("abc123"))).unwrap();

        let result = reg.unregister(cid(1));
        assert!(matches!(result, Err(SessionError::StillInRoom(..))));

        reg.set_room(cid(1), None).unwrap();
        let player = reg.unregister(cid(1)).unwrap();
        assert_eq!(player.connection_id, cid(1));
        assert!(reg.get(&cid(1)).is_none());
    }

    #[test]
    fn test_vacate_returns_the_room_once() {
        let mut reg = PlayerRegistry::default();
        reg.register(cid(1), dummy_sender()).unwrap();
        reg.set_room(cid(1), Some(RoomId::new("abc123"))).unwrap();

        assert_eq!(reg.vacate(cid(1)), Some(RoomId::new("abc123")));
        assert!(reg.get(&cid(1)).unwrap().current_room.is_none());
        assert_eq!(reg.vacate(cid(1)), None);
        assert_eq!(reg.vacate(cid(9)), None);
    }

    #[test]
    fn test_unregister_unknown_is_not_found() {
        let mut reg = PlayerRegistry::default();
        assert!(matches!(reg.unregister(cid(3)), Err(SessionError::NotFound(_))));
    }

    #[test]
    fn test_send_reaches_player_channel() {
        let mut reg = PlayerRegistry::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        reg.register(cid(1), tx).unwrap();

        reg.send(
            cid(1),
            Outbound::event(ServerEvent::Error {
                message: "Not in a room.".into(),
            }),
        );

        let frame = rx.try_recv().unwrap();
        assert!(matches!(frame.event, ServerEvent::Error { .. }));
    }

    #[test]
    fn test_send_to_dropped_receiver_does_not_panic() {
        let mut reg = PlayerRegistry::default();
        reg.register(cid(1), dummy_sender()).unwrap();
        reg.send(
            cid(1),
            Outbound::event(ServerEvent::Connected {
                connection_id: cid(1),
            }),
        );
    }
}
