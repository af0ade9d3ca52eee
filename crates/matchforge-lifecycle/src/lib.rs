//! Delayed room lifecycle transitions for Matchforge.
//!
//! Two timers drive a room's life besides client requests:
//!
//! - the **waiting timeout**, armed when a room is created, which closes a
//!   room still `waiting` after the delay
//! - the **cleanup timer**, armed when a room empties, which destroys a
//!   room still `cleanup-pending` after the grace period
//!
//! Timers are never cancelled. A fired timer is a [`Transition`] carrying
//! only the room id and the [`TimerKind`]; whoever owns the rooms checks
//! [`Transition::is_due`] against the room's *current* status and treats
//! anything else as a stale no-op. That makes "room refilled before the
//! cleanup fired" and "room already destroyed" the same easy case.
//!
//! # Integration
//!
//! The receiver half is meant to sit in the coordinator's `select!` loop:
//!
//! ```ignore
//! let (scheduler, mut fired) = LifecycleScheduler::new(delays);
//! loop {
//!     tokio::select! {
//!         Some(cmd) = commands.recv() => { /* client events */ }
//!         Some(transition) = fired.recv() => {
//!             let status = rooms.get(&transition.room_id).map(Room::status);
//!             if transition.is_due(status) { /* act */ }
//!         }
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use matchforge_protocol::{CloseReason, RoomId, RoomStatus};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Timer kinds
// ---------------------------------------------------------------------------

/// Which delayed transition fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Armed on creation; closes rooms that never moved on.
    WaitingTimeout,
    /// Armed when a room empties; destroys it after the grace period.
    Cleanup,
}

impl TimerKind {
    /// The status the room must still be in for the fire to act.
    pub fn expected_status(self) -> RoomStatus {
        match self {
            Self::WaitingTimeout => RoomStatus::Waiting,
            Self::Cleanup => RoomStatus::CleanupPending,
        }
    }

    /// What members still seated are told when the room closes.
    pub fn close_reason(self) -> CloseReason {
        match self {
            Self::WaitingTimeout => CloseReason::Timeout,
            Self::Cleanup => CloseReason::Empty,
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitingTimeout => f.write_str("waiting-timeout"),
            Self::Cleanup => f.write_str("cleanup"),
        }
    }
}

/// A timer that has fired. Captures the room id, never a room snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub room_id: RoomId,
    pub kind: TimerKind,
}

impl Transition {
    /// `true` if the room, as it is *now*, is still in the state that armed
    /// this timer. `current` is `None` when the room no longer exists.
    pub fn is_due(&self, current: Option<RoomStatus>) -> bool {
        current == Some(self.kind.expected_status())
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Delays for the two lifecycle timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleDelays {
    pub waiting_timeout: Duration,
    pub cleanup_delay: Duration,
}

impl Default for LifecycleDelays {
    fn default() -> Self {
        Self {
            waiting_timeout: Duration::from_secs(5 * 60),
            cleanup_delay: Duration::from_secs(10),
        }
    }
}

impl LifecycleDelays {
    /// The delay used for `kind`.
    pub fn delay_for(&self, kind: TimerKind) -> Duration {
        match kind {
            TimerKind::WaitingTimeout => self.waiting_timeout,
            TimerKind::Cleanup => self.cleanup_delay,
        }
    }
}

/// Arms lifecycle timers on the Tokio clock.
///
/// Cheap to clone; every clone delivers into the same receiver.
#[derive(Debug, Clone)]
pub struct LifecycleScheduler {
    delays: LifecycleDelays,
    fired: mpsc::UnboundedSender<Transition>,
    armed: Arc<AtomicUsize>,
}

impl LifecycleScheduler {
    /// Creates a scheduler and the receiver its transitions arrive on.
    pub fn new(
        delays: LifecycleDelays,
    ) -> (Self, mpsc::UnboundedReceiver<Transition>) {
        let (fired, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            delays,
            fired,
            armed: Arc::new(AtomicUsize::new(0)),
        };
        (scheduler, rx)
    }

    /// Number of timers armed and not yet fired.
    pub fn armed(&self) -> usize {
        self.armed.load(Ordering::Relaxed)
    }

    /// Arms `kind` for `room_id`. Must be called inside a Tokio runtime.
    ///
    /// The deadline is taken when this is called, not when the timer task
    /// first runs.
    ///
    /// There is no handle and no cancellation: the fire is re-validated
    /// by the receiver instead.
    pub fn arm(&self, room_id: RoomId, kind: TimerKind) {
        let delay = self.delays.delay_for(kind);
        let deadline = Instant::now() + delay;
        let fired = self.fired.clone();
        let armed = Arc::clone(&self.armed);
        armed.fetch_add(1, Ordering::Relaxed);

        debug!(%room_id, timer = %kind, ?delay, "timer armed");

        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            armed.fetch_sub(1, Ordering::Relaxed);
            trace!(%room_id, timer = %kind, "timer fired");
            if fired.send(Transition { room_id, kind }).is_err() {
                trace!("transition receiver dropped, discarding fire");
            }
        });
    }
}
