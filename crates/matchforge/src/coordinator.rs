//! The single task that owns the [`Matchmaker`].
//!
//! Connection handlers never touch the registries. They send [`Command`]s
//! here, and fired lifecycle timers arrive on a second channel. Both are
//! drained by one loop that finishes each event before taking the next,
//! so every matchmaking operation is atomic with respect to the others.

use matchforge_lifecycle::{LifecycleDelays, LifecycleScheduler, Transition};
use matchforge_protocol::{
    ClientEvent, CloseReason, ConnectionId, Inbound, Outbound, RoomId, ServerEvent, Settings,
};
use matchforge_room::{RoomConfig, RoomError};
use matchforge_session::{PlayerSender, SessionConfig};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::MatchforgeError;
use crate::matchmaker::{Matchmaker, MatchmakerStats};

/// Work for the coordinator.
#[derive(Debug)]
pub(crate) enum Command {
    Connected {
        connection_id: ConnectionId,
        sender: PlayerSender,
    },
    Inbound {
        connection_id: ConnectionId,
        frame: Inbound,
    },
    Disconnected {
        connection_id: ConnectionId,
    },
    Stats {
        reply: oneshot::Sender<MatchmakerStats>,
    },
}

/// Cheap, cloneable way to reach a running coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl CoordinatorHandle {
    /// Current room and player counts plus every room's snapshot.
    pub async fn stats(&self) -> Result<MatchmakerStats, MatchforgeError> {
        let (reply, rx) = oneshot::channel();
        if !self.send(Command::Stats { reply }) {
            return Err(MatchforgeError::CoordinatorStopped);
        }
        rx.await.map_err(|_| MatchforgeError::CoordinatorStopped)
    }

    /// Queues a command. Returns `false` if the coordinator has stopped.
    pub(crate) fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }
}

/// Builds the matchmaker and starts its task on the current runtime.
pub(crate) fn spawn(room_config: RoomConfig, session_config: SessionConfig) -> CoordinatorHandle {
    let (scheduler, transitions) = LifecycleScheduler::new(LifecycleDelays {
        waiting_timeout: room_config.waiting_timeout,
        cleanup_delay: room_config.cleanup_delay,
    });
    let matchmaker = Matchmaker::new(room_config, session_config, scheduler);
    let (commands, rx) = mpsc::unbounded_channel();
    tokio::spawn(run(matchmaker, rx, transitions));
    CoordinatorHandle { commands }
}

async fn run(
    mut matchmaker: Matchmaker,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut transitions: mpsc::UnboundedReceiver<Transition>,
) {
    debug!("coordinator running");

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => handle_command(&mut matchmaker, command),
                None => break,
            },
            Some(transition) = transitions.recv() => {
                matchmaker.handle_transition(transition);
            }
        }
    }

    debug!("coordinator stopped");
}

fn handle_command(matchmaker: &mut Matchmaker, command: Command) {
    match command {
        Command::Connected {
            connection_id,
            sender,
        } => {
            if let Err(e) = matchmaker.connect(connection_id, sender) {
                warn!(%connection_id, error = %e, "connect rejected");
            }
        }
        Command::Inbound {
            connection_id,
            frame,
        } => dispatch(matchmaker, connection_id, frame),
        Command::Disconnected { connection_id } => matchmaker.disconnect(connection_id),
        Command::Stats { reply } => {
            let _ = reply.send(matchmaker.stats());
        }
    }
}

/// Routes one client frame to the matchmaker and answers it.
///
/// Successful placements already produced `room-joined`; when the request
/// carried an `ack`, the snapshot is repeated in an acknowledgement frame.
/// Failures answer with `error`, tagged with the `ack` if there was one.
pub(crate) fn dispatch(matchmaker: &mut Matchmaker, connection_id: ConnectionId, frame: Inbound) {
    let Inbound { ack, event } = frame;
    let name = event.name();

    let placed = match event {
        ClientEvent::SetName { name } => {
            matchmaker.set_name(connection_id, name.as_ref());
            return;
        }
        ClientEvent::CreateRoom {
            activity_id,
            max_players,
            settings,
        } => matchmaker.create_room(
            connection_id,
            activity_id.as_ref(),
            max_players.as_ref(),
            settings_field(settings),
        ),
        ClientEvent::JoinRoom { room_id } => {
            matchmaker.join_room(connection_id, room_id_field(room_id).as_ref())
        }
        ClientEvent::QuickPlay { activity_id } => match activity_field(activity_id.as_ref()) {
            Ok(activity) => matchmaker.quick_play(connection_id, activity),
            Err(e) => Err(e.into()),
        },
        ClientEvent::LeaveRoom {} => {
            let room_id = matchmaker.leave_room(connection_id);
            matchmaker.send(
                connection_id,
                Outbound::reply(
                    ack,
                    ServerEvent::RoomClosed {
                        room_id,
                        reason: CloseReason::YouLeft,
                    },
                ),
            );
            return;
        }
        ClientEvent::ListRooms { activity_id } => {
            // a filter no room can match lists nothing
            let rooms = match activity_field(activity_id.as_ref()) {
                Ok(activity) => matchmaker.list_rooms(activity),
                Err(_) => Vec::new(),
            };
            matchmaker.send(connection_id, Outbound::reply(ack, ServerEvent::RoomList { rooms }));
            return;
        }
        ClientEvent::RoomMessage { kind, data } => {
            if let Err(e) = matchmaker.relay_message(connection_id, kind, data) {
                reject(matchmaker, connection_id, ack, name, &e);
            }
            return;
        }
    };

    match placed {
        Ok(snapshot) => {
            if let Some(ack) = ack {
                matchmaker.send(
                    connection_id,
                    Outbound::reply(Some(ack), ServerEvent::RoomJoined(snapshot)),
                );
            }
        }
        Err(e) => reject(matchmaker, connection_id, ack, name, &e),
    }
}

/// A `roomId` that is not a string names no room.
fn room_id_field(raw: Option<Value>) -> Option<RoomId> {
    match raw {
        Some(Value::String(id)) => Some(RoomId::new(id)),
        _ => None,
    }
}

/// An optional `activityId` filter. Missing, `null` and `false` mean any
/// activity; other non-strings are refused.
fn activity_field(raw: Option<&Value>) -> Result<Option<&str>, RoomError> {
    match raw {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::String(activity)) => Ok(Some(activity.as_str())),
        Some(_) => Err(RoomError::InvalidActivity),
    }
}

/// Settings that are not a JSON object are dropped.
fn settings_field(raw: Option<Value>) -> Option<Settings> {
    match raw {
        Some(Value::Object(settings)) => Some(settings),
        _ => None,
    }
}

fn reject(
    matchmaker: &Matchmaker,
    connection_id: ConnectionId,
    ack: Option<u64>,
    event: &str,
    error: &MatchforgeError,
) {
    debug!(%connection_id, event, error = %error, "request rejected");
    matchmaker.send(
        connection_id,
        Outbound::reply(
            ack,
            ServerEvent::Error {
                message: error.to_string(),
            },
        ),
    );
}
