//! The matchmaking engine.
//!
//! [`Matchmaker`] owns both registries and applies one request at a time:
//! placement (create, join, quick-play), departures, relaying, and the
//! delayed lifecycle transitions. It never awaits. Notifications are
//! queued on each player's outbound channel as a side effect, and the
//! direct result of a request is returned to the caller, which decides
//! how to acknowledge it.

use matchforge_lifecycle::{LifecycleScheduler, TimerKind, Transition};
use matchforge_protocol::{
    ConnectionId, MemberInfo, Outbound, RoomId, RoomSnapshot, ServerEvent, Settings,
};
use matchforge_room::{Room, RoomConfig, RoomError, RoomRegistry, generate_room_id};
use matchforge_session::{
    PlayerRegistry, PlayerSender, SessionConfig, SessionError, check_payload_size,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::MatchforgeError;
use crate::relay::{broadcast_membership_change, broadcast_room_update};

/// Activity given to quick-play rooms when the client names none.
pub const ANY_ACTIVITY: &str = "any";

/// Point-in-time counts for health reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchmakerStats {
    /// Registered rooms, in any status.
    pub rooms: usize,
    /// Live connections.
    pub players: usize,
    /// Snapshot of every registered room, in creation order.
    pub room_list: Vec<RoomSnapshot>,
}

/// Room placement and membership for every live connection.
#[derive(Debug)]
pub struct Matchmaker {
    players: PlayerRegistry,
    rooms: RoomRegistry,
    config: RoomConfig,
    scheduler: LifecycleScheduler,
}

impl Matchmaker {
    pub fn new(
        config: RoomConfig,
        session: SessionConfig,
        scheduler: LifecycleScheduler,
    ) -> Self {
        Self {
            players: PlayerRegistry::new(session),
            rooms: RoomRegistry::new(),
            config,
            scheduler,
        }
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Queues a frame for one connection.
    pub fn send(&self, connection_id: ConnectionId, frame: Outbound) {
        self.players.send(connection_id, frame);
    }

    // -----------------------------------------------------------------------
    // Connections
    // -----------------------------------------------------------------------

    /// Registers a new connection and greets it with `connected`.
    pub fn connect(
        &mut self,
        connection_id: ConnectionId,
        sender: PlayerSender,
    ) -> Result<(), MatchforgeError> {
        self.players.register(connection_id, sender)?;
        self.players.send(
            connection_id,
            Outbound::event(ServerEvent::Connected { connection_id }),
        );
        info!(%connection_id, "connected");
        Ok(())
    }

    /// Takes the connection out of its room, then forgets it.
    pub fn disconnect(&mut self, connection_id: ConnectionId) {
        self.leave_room(connection_id);
        match self.players.unregister(connection_id) {
            Ok(_) => info!(%connection_id, "disconnected"),
            Err(e) => debug!(%connection_id, error = %e, "disconnect ignored"),
        }
    }

    /// Applies a sanitized display name. Seats already taken keep the old one.
    pub fn set_name(&mut self, connection_id: ConnectionId, raw: Option<&Value>) {
        if let Some(name) = self.players.set_name(connection_id, raw) {
            debug!(%connection_id, display_name = name, "name set");
        }
    }

    // -----------------------------------------------------------------------
    // Placement
    // -----------------------------------------------------------------------

    /// Opens a new `waiting` room with the caller as host.
    ///
    /// `activity_id` must be a non-empty string. `max_players` goes through
    /// [`RoomConfig::clamp_max_players`].
    pub fn create_room(
        &mut self,
        connection_id: ConnectionId,
        activity_id: Option<&Value>,
        max_players: Option<&Value>,
        settings: Option<Settings>,
    ) -> Result<RoomSnapshot, MatchforgeError> {
        let host = self.roomless_member(connection_id)?;
        let activity = match activity_id {
            Some(Value::String(a)) if !a.is_empty() => a.clone(),
            _ => return Err(RoomError::InvalidActivity.into()),
        };
        let max_players = self.config.clamp_max_players(max_players);

        let snapshot = self.open_room(host, activity, max_players, settings.unwrap_or_default())?;
        info!(
            %connection_id,
            room_id = %snapshot.room_id,
            activity = %snapshot.activity_id,
            max_players,
            "room created"
        );
        Ok(snapshot)
    }

    /// Seats the caller in a specific `waiting` room.
    pub fn join_room(
        &mut self,
        connection_id: ConnectionId,
        room_id: Option<&RoomId>,
    ) -> Result<RoomSnapshot, MatchforgeError> {
        let member = self.roomless_member(connection_id)?;
        let room_id = room_id.ok_or(RoomError::NotFound(None))?;

        let snapshot = self.seat(member, room_id)?;
        info!(%connection_id, %room_id, players = snapshot.player_count, "joined room");
        Ok(snapshot)
    }

    /// Seats the caller in the first open room for `activity`, or opens one.
    ///
    /// The scan is first-fit in creation order. An empty or missing
    /// activity matches any room, and a room opened for it uses
    /// [`ANY_ACTIVITY`] and the default capacity.
    pub fn quick_play(
        &mut self,
        connection_id: ConnectionId,
        activity: Option<&str>,
    ) -> Result<RoomSnapshot, MatchforgeError> {
        let member = self.roomless_member(connection_id)?;
        let activity = activity.filter(|a| !a.is_empty());

        if let Some(room_id) = self.rooms.find_open(activity).cloned() {
            let snapshot = self.seat(member, &room_id)?;
            info!(%connection_id, %room_id, "quick-matched into room");
            return Ok(snapshot);
        }

        let activity = activity.unwrap_or(ANY_ACTIVITY).to_string();
        let max_players = self.config.default_max_players;
        let snapshot = self.open_room(member, activity, max_players, Settings::new())?;
        info!(
            %connection_id,
            room_id = %snapshot.room_id,
            activity = %snapshot.activity_id,
            "quick-play room created"
        );
        Ok(snapshot)
    }

    /// Vacates the caller's seat, if any.
    ///
    /// Remaining members get `player-left` and a fresh snapshot (with a new
    /// host if the host left). The last member out starts the cleanup timer.
    /// Returns the id of the room that was left.
    pub fn leave_room(&mut self, connection_id: ConnectionId) -> Option<RoomId> {
        let room_id = self.players.vacate(connection_id)?;

        let Some(room) = self.rooms.get_mut(&room_id) else {
            return Some(room_id);
        };
        let Some(departure) = room.remove_member(connection_id) else {
            return Some(room_id);
        };
        info!(%connection_id, %room_id, "left room");

        broadcast_membership_change(
            &self.players,
            room,
            ServerEvent::PlayerLeft(departure.member),
            None,
        );

        if departure.emptied {
            debug!(%room_id, "room empty, cleanup scheduled");
            self.scheduler.arm(room_id.clone(), TimerKind::Cleanup);
        } else {
            if let Some(host) = departure.new_host {
                info!(%room_id, %host, "host reassigned");
            }
            broadcast_room_update(&self.players, room);
        }
        Some(room_id)
    }

    /// Open rooms, optionally for one activity, in creation order.
    pub fn list_rooms(&self, activity: Option<&str>) -> Vec<RoomSnapshot> {
        self.rooms.list_open(activity.filter(|a| !a.is_empty()))
    }

    // -----------------------------------------------------------------------
    // Relay
    // -----------------------------------------------------------------------

    /// Forwards an opaque `{type, data}` message to the caller's roommates.
    ///
    /// Returns how many members it was queued for.
    pub fn relay_message(
        &self,
        connection_id: ConnectionId,
        kind: Value,
        data: Value,
    ) -> Result<usize, MatchforgeError> {
        let player = self.players.get(&connection_id).ok_or(RoomError::NotInRoom)?;
        let room_id = player.current_room.as_ref().ok_or(RoomError::NotInRoom)?;
        check_payload_size(&kind, &data, self.players.config().max_message_bytes)?;

        let Some(room) = self.rooms.get(room_id) else {
            return Ok(0);
        };
        let from = player.member_info();
        Ok(broadcast_membership_change(
            &self.players,
            room,
            ServerEvent::RoomMessage { from, kind, data },
            Some(connection_id),
        ))
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Acts on a fired timer if its room is still in the status that armed it.
    ///
    /// Members still seated are told the room closed and lose their seat.
    /// Returns `true` if the room was destroyed.
    pub fn handle_transition(&mut self, transition: Transition) -> bool {
        let status = self.rooms.get(&transition.room_id).map(Room::status);
        if !transition.is_due(status) {
            debug!(
                room_id = %transition.room_id,
                timer = %transition.kind,
                ?status,
                "stale timer ignored"
            );
            return false;
        }
        let Some(room) = self.rooms.remove(&transition.room_id) else {
            return false;
        };

        let reason = transition.kind.close_reason();
        for member in room.members() {
            self.players.send(
                member.connection_id,
                Outbound::event(ServerEvent::RoomClosed {
                    room_id: Some(transition.room_id.clone()),
                    reason,
                }),
            );
            if self.players.vacate(member.connection_id).is_none() {
                debug!(
                    connection_id = %member.connection_id,
                    room_id = %transition.room_id,
                    "closed room listed a member with no seat"
                );
            }
        }
        info!(
            room_id = %transition.room_id,
            timer = %transition.kind,
            members = room.player_count(),
            "room destroyed"
        );
        true
    }

    pub fn stats(&self) -> MatchmakerStats {
        MatchmakerStats {
            rooms: self.rooms.len(),
            players: self.players.len(),
            room_list: self.rooms.snapshots(),
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// The caller's seat description, provided they sit in no room.
    fn roomless_member(
        &self,
        connection_id: ConnectionId,
    ) -> Result<MemberInfo, MatchforgeError> {
        let player = self
            .players
            .get(&connection_id)
            .ok_or(SessionError::NotFound(connection_id))?;
        if let Some(room_id) = &player.current_room {
            return Err(RoomError::AlreadyInRoom(room_id.clone()).into());
        }
        Ok(player.member_info())
    }

    /// Registers a fresh room around `host` and arms its waiting timeout.
    fn open_room(
        &mut self,
        host: MemberInfo,
        activity: String,
        max_players: usize,
        settings: Settings,
    ) -> Result<RoomSnapshot, MatchforgeError> {
        let connection_id = host.connection_id;
        let room_id = generate_room_id(&self.rooms, self.config.room_id_len);
        self.players.set_room(connection_id, Some(room_id.clone()))?;

        let room = Room::new(room_id.clone(), activity, host, max_players, settings);
        let snapshot = room.snapshot();
        self.rooms.insert(room);

        self.players.send(
            connection_id,
            Outbound::event(ServerEvent::RoomJoined(snapshot.clone())),
        );
        self.scheduler.arm(room_id, TimerKind::WaitingTimeout);
        Ok(snapshot)
    }

    /// Adds `member` to an existing room and notifies everyone.
    ///
    /// Order: `player-joined` to the others, `room-joined` to the newcomer,
    /// then `room-updated` to all.
    fn seat(
        &mut self,
        member: MemberInfo,
        room_id: &RoomId,
    ) -> Result<RoomSnapshot, MatchforgeError> {
        let connection_id = member.connection_id;
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::NotFound(Some(room_id.clone())))?;
        room.add_member(member.clone())?;
        self.players.set_room(connection_id, Some(room_id.clone()))?;

        broadcast_membership_change(
            &self.players,
            room,
            ServerEvent::PlayerJoined(member),
            Some(connection_id),
        );
        let snapshot = room.snapshot();
        self.players.send(
            connection_id,
            Outbound::event(ServerEvent::RoomJoined(snapshot.clone())),
        );
        broadcast_room_update(&self.players, room);
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use matchforge_lifecycle::LifecycleDelays;
    use matchforge_protocol::{CloseReason, RoomStatus};
    use serde_json::json;
    use tokio::sync::mpsc;

    use super::*;

    type Inbox = mpsc::UnboundedReceiver<Outbound>;

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn matchmaker() -> (Matchmaker, mpsc::UnboundedReceiver<Transition>) {
        let config = RoomConfig::default();
        let (scheduler, fired) = LifecycleScheduler::new(LifecycleDelays {
            waiting_timeout: config.waiting_timeout,
            cleanup_delay: config.cleanup_delay,
        });
        (Matchmaker::new(config, SessionConfig::default(), scheduler), fired)
    }

    /// Registers a connection and swallows its `connected` greeting.
    fn connect(mm: &mut Matchmaker, id: u64) -> Inbox {
        let (tx, mut rx) = mpsc::unbounded_channel();
        mm.connect(cid(id), tx).unwrap();
        assert!(matches!(
            rx.try_recv().unwrap().event,
            ServerEvent::Connected { .. }
        ));
        rx
    }

    fn drain(rx: &mut Inbox) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            events.push(frame.event);
        }
        events
    }

    fn create(mm: &mut Matchmaker, id: u64, activity: &str, max: u64) -> RoomSnapshot {
        mm.create_room(cid(id), Some(&json!(activity)), Some(&json!(max)), None)
            .unwrap()
    }

    /// Capacity, host, and seat-reference invariants over the whole state.
    fn assert_invariants(mm: &Matchmaker) {
        for room in mm.rooms().iter() {
            assert!(room.player_count() <= room.max_players());
            if !room.is_empty() {
                let host = room.host_id().expect("non-empty room has a host");
                assert!(room.has_member(host));
            }
        }
        for player in mm.players().iter() {
            if let Some(room_id) = &player.current_room {
                let room = mm.rooms().get(room_id).expect("seat points at a live room");
                assert!(room.has_member(player.connection_id));
            }
        }
    }

    #[tokio::test]
    async fn test_connect_greets_with_connection_id() {
        let (mut mm, _fired) = matchmaker();
        let (tx, mut rx) = mpsc::unbounded_channel();
        mm.connect(cid(7), tx).unwrap();

        assert_eq!(
            rx.try_recv().unwrap().event,
            ServerEvent::Connected {
                connection_id: cid(7)
            }
        );
        assert_eq!(mm.players().len(), 1);
    }

    #[tokio::test]
    async fn test_create_room_seats_creator_as_host() {
        let (mut mm, _fired) = matchmaker();
        let mut rx = connect(&mut mm, 1);

        let snapshot = create(&mut mm, 1, "duel", 2);
        assert_eq!(snapshot.player_count, 1);
        assert_eq!(snapshot.status, RoomStatus::Waiting);
        assert_eq!(snapshot.host_id, Some(cid(1)));
        assert_eq!(snapshot.max_players, 2);
        assert_eq!(snapshot.room_id.as_str().len(), 6);

        assert_eq!(drain(&mut rx), vec![ServerEvent::RoomJoined(snapshot.clone())]);
        assert_eq!(
            mm.players().get(&cid(1)).unwrap().current_room,
            Some(snapshot.room_id)
        );
    }

    #[tokio::test]
    async fn test_create_room_while_seated_is_rejected() {
        let (mut mm, _fired) = matchmaker();
        let _rx = connect(&mut mm, 1);
        create(&mut mm, 1, "duel", 2);

        let err = mm
            .create_room(cid(1), Some(&json!("duel")), None, None)
            .unwrap_err();
        assert!(matches!(err, MatchforgeError::Room(RoomError::AlreadyInRoom(_))));
        assert_eq!(err.to_string(), "Already in a room. Leave first.");
        assert_eq!(mm.rooms().len(), 1);
    }

    #[tokio::test]
    async fn test_create_room_requires_string_activity() {
        let (mut mm, _fired) = matchmaker();
        let _rx = connect(&mut mm, 1);

        for bad in [None, Some(json!(42)), Some(json!("")), Some(json!(null))] {
            let err = mm.create_room(cid(1), bad.as_ref(), None, None).unwrap_err();
            assert_eq!(err.to_string(), "activityId is required.");
        }
        assert!(mm.rooms().is_empty());
    }

    #[tokio::test]
    async fn test_create_room_clamps_capacity_and_keeps_settings() {
        let (mut mm, _fired) = matchmaker();
        let _a = connect(&mut mm, 1);
        let _b = connect(&mut mm, 2);

        let mut settings = Settings::new();
        settings.insert("map".into(), json!("arena"));
        let big = mm
            .create_room(cid(1), Some(&json!("duel")), Some(&json!(100)), Some(settings))
            .unwrap();
        assert_eq!(big.max_players, 16);
        assert_eq!(big.settings["map"], json!("arena"));

        let from_text = mm
            .create_room(cid(2), Some(&json!("duel")), Some(&json!("3")), None)
            .unwrap();
        assert_eq!(from_text.max_players, 3);
        assert!(from_text.settings.is_empty());
    }

    #[tokio::test]
    async fn test_join_notifies_in_order_and_rejects_when_full() {
        let (mut mm, _fired) = matchmaker();
        let mut x = connect(&mut mm, 1);
        let mut y = connect(&mut mm, 2);
        let mut z = connect(&mut mm, 3);

        let room = create(&mut mm, 1, "duel", 2);
        drain(&mut x);

        let joined = mm.join_room(cid(2), Some(&room.room_id)).unwrap();
        assert_eq!(joined.player_count, 2);

        let host_events = drain(&mut x);
        assert!(matches!(&host_events[0], ServerEvent::PlayerJoined(m) if m.connection_id == cid(2)));
        assert!(matches!(&host_events[1], ServerEvent::RoomUpdated(s) if s.player_count == 2));
        assert_eq!(host_events.len(), 2);

        let joiner_events = drain(&mut y);
        assert!(matches!(&joiner_events[0], ServerEvent::RoomJoined(s) if s.player_count == 2));
        assert!(matches!(&joiner_events[1], ServerEvent::RoomUpdated(s) if s.player_count == 2));
        assert_eq!(joiner_events.len(), 2);

        let err = mm.join_room(cid(3), Some(&room.room_id)).unwrap_err();
        assert_eq!(err.to_string(), "Room is full.");
        assert!(drain(&mut z).is_empty());
        assert!(mm.players().get(&cid(3)).unwrap().current_room.is_none());
        assert_invariants(&mm);
    }

    #[tokio::test]
    async fn test_join_unknown_or_missing_room() {
        let (mut mm, _fired) = matchmaker();
        let _rx = connect(&mut mm, 1);

        let err = mm.join_room(cid(1), Some(&RoomId::new("nope00"))).unwrap_err();
        assert!(matches!(err, MatchforgeError::Room(RoomError::NotFound(Some(_)))));
        assert_eq!(err.to_string(), "Room not found.");

        let err = mm.join_room(cid(1), None).unwrap_err();
        assert!(matches!(err, MatchforgeError::Room(RoomError::NotFound(None))));
    }

    #[tokio::test]
    async fn test_join_while_seated_is_rejected() {
        let (mut mm, _fired) = matchmaker();
        let _a = connect(&mut mm, 1);
        let _b = connect(&mut mm, 2);
        let first = create(&mut mm, 1, "duel", 4);
        create(&mut mm, 2, "duel", 4);

        let err = mm.join_room(cid(2), Some(&first.room_id)).unwrap_err();
        assert!(matches!(err, MatchforgeError::Room(RoomError::AlreadyInRoom(_))));
        assert_eq!(mm.rooms().get(&first.room_id).unwrap().player_count(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_pending_room_only_takes_back_last_member() {
        let (mut mm, _fired) = matchmaker();
        let _a = connect(&mut mm, 1);
        let _b = connect(&mut mm, 2);
        let room = create(&mut mm, 1, "duel", 2);
        mm.leave_room(cid(1));
        assert_eq!(
            mm.rooms().get(&room.room_id).unwrap().status(),
            RoomStatus::CleanupPending
        );

        let err = mm.join_room(cid(2), Some(&room.room_id)).unwrap_err();
        assert_eq!(err.to_string(), "Room is not accepting players.");

        let revived = mm.join_room(cid(1), Some(&room.room_id)).unwrap();
        assert_eq!(revived.status, RoomStatus::Waiting);
        assert_eq!(revived.host_id, Some(cid(1)));
        assert_eq!(revived.player_count, 1);
        assert_invariants(&mm);
    }

    #[tokio::test]
    async fn test_quick_play_is_first_fit_not_best_fit() {
        let (mut mm, _fired) = matchmaker();
        let _conns: Vec<Inbox> = (1..=4).map(|id| connect(&mut mm, id)).collect();

        let older = create(&mut mm, 1, "duel", 4);
        let newer = create(&mut mm, 2, "duel", 4);
        mm.join_room(cid(3), Some(&newer.room_id)).unwrap();

        // The newer room is fuller, but the older one comes first in the scan.
        let placed = mm.quick_play(cid(4), Some("duel")).unwrap();
        assert_eq!(placed.room_id, older.room_id);
        assert_eq!(placed.player_count, 2);
        assert_invariants(&mm);
    }

    #[tokio::test]
    async fn test_quick_play_skips_full_and_other_activities() {
        let (mut mm, _fired) = matchmaker();
        let _conns: Vec<Inbox> = (1..=4).map(|id| connect(&mut mm, id)).collect();

        let full = create(&mut mm, 1, "duel", 2);
        mm.join_room(cid(2), Some(&full.room_id)).unwrap();
        let chess = create(&mut mm, 3, "chess", 2);

        let placed = mm.quick_play(cid(4), Some("duel")).unwrap();
        assert_ne!(placed.room_id, full.room_id);
        assert_ne!(placed.room_id, chess.room_id);
        assert_eq!(placed.activity_id, "duel");
        assert_eq!(placed.host_id, Some(cid(4)));
        assert_eq!(mm.rooms().len(), 3);
    }

    #[tokio::test]
    async fn test_quick_play_without_activity_opens_any_room() {
        let (mut mm, _fired) = matchmaker();
        let mut rx = connect(&mut mm, 1);

        let snapshot = mm.quick_play(cid(1), None).unwrap();
        assert_eq!(snapshot.activity_id, ANY_ACTIVITY);
        assert_eq!(snapshot.max_players, 4);
        assert_eq!(drain(&mut rx), vec![ServerEvent::RoomJoined(snapshot)]);
    }

    #[tokio::test]
    async fn test_quick_play_without_activity_joins_any_open_room() {
        let (mut mm, _fired) = matchmaker();
        let _a = connect(&mut mm, 1);
        let _b = connect(&mut mm, 2);
        let room = create(&mut mm, 1, "chess", 2);

        let placed = mm.quick_play(cid(2), Some("")).unwrap();
        assert_eq!(placed.room_id, room.room_id);
    }

    #[tokio::test]
    async fn test_quick_play_while_seated_is_rejected() {
        let (mut mm, _fired) = matchmaker();
        let _a = connect(&mut mm, 1);
        create(&mut mm, 1, "duel", 2);

        let err = mm.quick_play(cid(1), Some("duel")).unwrap_err();
        assert!(matches!(err, MatchforgeError::Room(RoomError::AlreadyInRoom(_))));
    }

    #[tokio::test]
    async fn test_host_leaving_reassigns_and_notifies() {
        let (mut mm, _fired) = matchmaker();
        let mut x = connect(&mut mm, 1);
        let mut y = connect(&mut mm, 2);
        let room = create(&mut mm, 1, "duel", 2);
        mm.join_room(cid(2), Some(&room.room_id)).unwrap();
        drain(&mut x);
        drain(&mut y);

        assert_eq!(mm.leave_room(cid(1)), Some(room.room_id.clone()));

        let events = drain(&mut y);
        assert!(matches!(&events[0], ServerEvent::PlayerLeft(m) if m.connection_id == cid(1)));
        match &events[1] {
            ServerEvent::RoomUpdated(s) => {
                assert_eq!(s.host_id, Some(cid(2)));
                assert_eq!(s.player_count, 1);
            }
            other => panic!("expected RoomUpdated, got {other:?}"),
        }
        assert!(drain(&mut x).is_empty());
        assert!(mm.players().get(&cid(1)).unwrap().current_room.is_none());
        assert_invariants(&mm);
    }

    #[tokio::test]
    async fn test_leave_without_room_is_noop() {
        let (mut mm, _fired) = matchmaker();
        let mut rx = connect(&mut mm, 1);
        assert_eq!(mm.leave_room(cid(1)), None);
        assert_eq!(mm.leave_room(cid(99)), None);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_list_rooms_shows_only_open_rooms() {
        let (mut mm, _fired) = matchmaker();
        let _conns: Vec<Inbox> = (1..=4).map(|id| connect(&mut mm, id)).collect();

        let open = create(&mut mm, 1, "duel", 4);
        let full = create(&mut mm, 2, "duel", 2);
        mm.join_room(cid(3), Some(&full.room_id)).unwrap();
        let chess = create(&mut mm, 4, "chess", 2);

        let duel: Vec<RoomId> = mm.list_rooms(Some("duel")).into_iter().map(|s| s.room_id).collect();
        assert_eq!(duel, vec![open.room_id.clone()]);

        let all: Vec<RoomId> = mm.list_rooms(None).into_iter().map(|s| s.room_id).collect();
        assert_eq!(all, vec![open.room_id, chess.room_id]);
    }

    #[tokio::test]
    async fn test_relay_reaches_roommates_only() {
        let (mut mm, _fired) = matchmaker();
        let mut x = connect(&mut mm, 1);
        let mut y = connect(&mut mm, 2);
        let mut outsider = connect(&mut mm, 3);
        mm.set_name(cid(1), Some(&json!("Ann")));
        let room = create(&mut mm, 1, "duel", 2);
        mm.join_room(cid(2), Some(&room.room_id)).unwrap();
        drain(&mut x);
        drain(&mut y);

        let sent = mm
            .relay_message(cid(1), json!("move"), json!({"x": 3}))
            .unwrap();
        assert_eq!(sent, 1);

        assert_eq!(
            drain(&mut y),
            vec![ServerEvent::RoomMessage {
                from: MemberInfo {
                    connection_id: cid(1),
                    display_name: "Ann".into(),
                },
                kind: json!("move"),
                data: json!({"x": 3}),
            }]
        );
        assert!(drain(&mut x).is_empty());
        assert!(drain(&mut outsider).is_empty());
    }

    #[tokio::test]
    async fn test_relay_requires_a_room() {
        let (mut mm, _fired) = matchmaker();
        let _rx = connect(&mut mm, 1);

        let err = mm.relay_message(cid(1), json!("move"), json!({})).unwrap_err();
        assert_eq!(err.to_string(), "Not in a room.");
    }

    #[tokio::test]
    async fn test_relay_rejects_oversized_payload() {
        let (mut mm, _fired) = matchmaker();
        let _x = connect(&mut mm, 1);
        let mut y = connect(&mut mm, 2);
        let room = create(&mut mm, 1, "duel", 2);
        mm.join_room(cid(2), Some(&room.room_id)).unwrap();
        drain(&mut y);

        let blob = "x".repeat(5000);
        let err = mm.relay_message(cid(1), json!("blob"), json!(blob)).unwrap_err();
        assert!(matches!(
            err,
            MatchforgeError::Session(SessionError::PayloadTooLarge { .. })
        ));
        assert_eq!(err.to_string(), "Message too large.");
        assert!(drain(&mut y).is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_leaves_no_dangling_seats() {
        let (mut mm, _fired) = matchmaker();
        let _conns: Vec<Inbox> = (1..=3).map(|id| connect(&mut mm, id)).collect();
        let room = create(&mut mm, 1, "duel", 3);
        mm.join_room(cid(2), Some(&room.room_id)).unwrap();
        mm.join_room(cid(3), Some(&room.room_id)).unwrap();

        mm.disconnect(cid(1));
        mm.disconnect(cid(3));

        assert!(mm.players().get(&cid(1)).is_none());
        assert_eq!(mm.players().len(), 1);
        let live = mm.rooms().get(&room.room_id).unwrap();
        assert_eq!(live.host_id(), Some(cid(2)));
        assert_eq!(live.player_count(), 1);
        assert_invariants(&mm);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejoin_before_cleanup_survives_the_timer() {
        let (mut mm, mut fired) = matchmaker();
        let mut x = connect(&mut mm, 1);
        let room = create(&mut mm, 1, "duel", 2);
        mm.leave_room(cid(1));
        mm.join_room(cid(1), Some(&room.room_id)).unwrap();
        drain(&mut x);

        tokio::time::advance(Duration::from_secs(11)).await;
        let transition = fired.recv().await.unwrap();
        assert_eq!(transition.kind, TimerKind::Cleanup);

        assert!(!mm.handle_transition(transition));
        assert!(mm.rooms().contains(&room.room_id));
        assert!(
            !drain(&mut x)
                .iter()
                .any(|e| matches!(e, ServerEvent::RoomClosed { .. }))
        );
        assert_invariants(&mm);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_destroys_abandoned_room() {
        let (mut mm, mut fired) = matchmaker();
        let _x = connect(&mut mm, 1);
        let room = create(&mut mm, 1, "duel", 2);
        mm.disconnect(cid(1));
        assert!(mm.list_rooms(None).is_empty());
        assert_eq!(mm.stats().rooms, 1);

        tokio::time::advance(Duration::from_secs(10)).await;
        let transition = fired.recv().await.unwrap();
        assert!(mm.handle_transition(transition));

        assert!(!mm.rooms().contains(&room.room_id));
        assert_eq!(mm.stats().rooms, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_timeout_closes_room_for_members() {
        let (mut mm, mut fired) = matchmaker();
        let mut x = connect(&mut mm, 1);
        let room = create(&mut mm, 1, "duel", 2);
        drain(&mut x);

        tokio::time::advance(Duration::from_secs(5 * 60)).await;
        let transition = fired.recv().await.unwrap();
        assert_eq!(transition.kind, TimerKind::WaitingTimeout);
        assert!(mm.handle_transition(transition));

        assert_eq!(
            drain(&mut x),
            vec![ServerEvent::RoomClosed {
                room_id: Some(room.room_id.clone()),
                reason: CloseReason::Timeout,
            }]
        );
        assert!(!mm.rooms().contains(&room.room_id));
        assert!(mm.players().get(&cid(1)).unwrap().current_room.is_none());
        assert_invariants(&mm);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_timeout_after_destroy_is_stale() {
        let (mut mm, mut fired) = matchmaker();
        let _x = connect(&mut mm, 1);
        create(&mut mm, 1, "duel", 2);
        mm.leave_room(cid(1));

        let cleanup = fired.recv().await.unwrap();
        assert!(mm.handle_transition(cleanup));

        let timeout = fired.recv().await.unwrap();
        assert_eq!(timeout.kind, TimerKind::WaitingTimeout);
        assert!(!mm.handle_transition(timeout));
    }

    #[tokio::test]
    async fn test_stats_counts_everything() {
        let (mut mm, _fired) = matchmaker();
        let _conns: Vec<Inbox> = (1..=3).map(|id| connect(&mut mm, id)).collect();
        let a = create(&mut mm, 1, "duel", 2);
        let b = create(&mut mm, 2, "chess", 2);
        mm.leave_room(cid(2));

        let stats = mm.stats();
        assert_eq!(stats.rooms, 2);
        assert_eq!(stats.players, 3);
        let ids: Vec<RoomId> = stats.room_list.into_iter().map(|s| s.room_id).collect();
        assert_eq!(ids, vec![a.room_id, b.room_id]);

        let json = serde_json::to_value(mm.stats()).unwrap();
        assert_eq!(json["rooms"], 2);
        assert_eq!(json["roomList"][1]["status"], "cleanup-pending");
    }
}
