//! Per-connection handler: upgrade, register, pump frames in both
//! directions, unregister.
//!
//! Each accepted socket gets its own Tokio task running this handler.
//! The flow is:
//!   1. Finish the WebSocket upgrade within the handshake timeout
//!   2. Register with the coordinator, handing it the outbound sender
//!   3. Spawn a writer task that encodes queued frames onto the socket and
//!      pings the peer on a fixed interval
//!   4. Loop: receive frames → decode → forward to the coordinator, giving
//!      up when the peer goes quiet for the idle timeout
//!   5. On close, tell the coordinator (via a drop guard)

use std::sync::Arc;

use matchforge_protocol::{Codec, ConnectionId, Inbound, Outbound, ServerEvent};
use matchforge_session::SessionConfig;
use matchforge_transport::{
    Connection, Received, TransportError, Upgrade, WebSocketConnection, WebSocketUpgrade,
};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use crate::MatchforgeError;
use crate::coordinator::{Command, CoordinatorHandle};

/// Sent back when a frame cannot be decoded.
pub(crate) const MALFORMED_FRAME: &str = "Malformed message.";

/// Drop guard that unregisters the connection when the handler exits.
///
/// Runs even if the handler panics. The command channel is unbounded, so
/// the send is synchronous and needs no spawned task.
struct DisconnectGuard {
    connection_id: ConnectionId,
    coordinator: CoordinatorHandle,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        self.coordinator.send(Command::Disconnected {
            connection_id: self.connection_id,
        });
    }
}

/// Handles a single socket from TCP accept to close.
pub(crate) async fn handle_connection<C>(
    pending: WebSocketUpgrade,
    coordinator: CoordinatorHandle,
    codec: C,
    session: SessionConfig,
) -> Result<(), MatchforgeError>
where
    C: Codec + Clone + Send + Sync + 'static,
{
    // --- Step 1: Upgrade ---
    let peer = pending.peer_addr();
    let conn = match tokio::time::timeout(session.handshake_timeout, pending.upgrade()).await {
        Ok(upgraded) => Arc::new(upgraded?),
        Err(_) => return Err(TransportError::HandshakeTimedOut { peer }.into()),
    };
    let connection_id = conn.id();
    tracing::debug!(%connection_id, %peer, "handling new connection");

    // --- Step 2: Register ---
    let (outbound, queued) = mpsc::unbounded_channel::<Outbound>();
    if !coordinator.send(Command::Connected {
        connection_id,
        sender: outbound.clone(),
    }) {
        return Err(MatchforgeError::CoordinatorStopped);
    }
    let guard = DisconnectGuard {
        connection_id,
        coordinator: coordinator.clone(),
    };

    // --- Step 3: Writer ---
    let writer = tokio::spawn(write_loop(
        Arc::clone(&conn),
        queued,
        codec.clone(),
        session.ping_interval,
    ));

    // --- Step 4: Read loop ---
    loop {
        let data = match tokio::time::timeout(session.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(Received::Data(data)))) => data,
            Ok(Ok(Some(Received::Heartbeat))) => continue,
            Ok(Ok(None)) => {
                tracing::debug!(%connection_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%connection_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%connection_id, "connection timed out");
                break;
            }
        };

        let frame: Inbound = match codec.decode(&data) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(%connection_id, error = %e, "failed to decode frame");
                let _ = outbound.send(Outbound::event(ServerEvent::Error {
                    message: MALFORMED_FRAME.to_string(),
                }));
                continue;
            }
        };

        if !coordinator.send(Command::Inbound {
            connection_id,
            frame,
        }) {
            break;
        }
    }

    // The coordinator unregisters the player and drops its sender; the
    // writer then drains what is queued and exits on its own.
    drop(guard);
    drop(outbound);
    if let Err(e) = writer.await {
        tracing::debug!(%connection_id, error = %e, "writer task failed");
    }
    let _ = conn.close().await;
    Ok(())
}

/// Encodes queued frames onto the socket and pings between them.
///
/// Exits when the queue closes or a write fails.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut queued: mpsc::UnboundedReceiver<Outbound>,
    codec: C,
    ping_interval: std::time::Duration,
) {
    let connection_id = conn.id();
    let mut heartbeat = tokio::time::interval_at(Instant::now() + ping_interval, ping_interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let sent = tokio::select! {
            frame = queued.recv() => {
                let Some(frame) = frame else { break };
                match codec.encode_text(&frame) {
                    Ok(text) => conn.send_text(&text).await,
                    Err(e) => {
                        tracing::warn!(%connection_id, error = %e, "failed to encode frame");
                        Ok(())
                    }
                }
            }
            _ = heartbeat.tick() => conn.ping().await,
        };
        if let Err(e) = sent {
            tracing::debug!(%connection_id, error = %e, "send failed, writer exiting");
            break;
        }
    }
}
