//! # Matchforge
//!
//! Real-time matchmaking and room coordination over WebSockets.
//!
//! Clients connect, pick a display name, and create, join, or quick-play
//! into short-lived rooms for an activity. Once seated they can relay
//! opaque messages to their roommates. Rooms that never fill time out,
//! and rooms that empty are destroyed after a short grace period.
//!
//! All matchmaking state lives in one coordinator task; connection
//! handlers talk to it over channels, so no registry is ever locked.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use matchforge::prelude::*;
//!
//! # async fn start() -> Result<(), MatchforgeError> {
//! let server = MatchforgeServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .path("/matchmaker")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod coordinator;
mod error;
mod handler;
mod matchmaker;
mod relay;
mod server;

pub use coordinator::CoordinatorHandle;
pub use error::MatchforgeError;
pub use matchmaker::{ANY_ACTIVITY, Matchmaker, MatchmakerStats};
pub use relay::{broadcast_membership_change, broadcast_room_update};
pub use server::{MatchforgeServer, MatchforgeServerBuilder};

pub mod prelude {
    pub use crate::{
        CoordinatorHandle, MatchforgeError, MatchforgeServer, MatchforgeServerBuilder,
        MatchmakerStats,
    };
    pub use matchforge_lifecycle::{LifecycleDelays, TimerKind, Transition};
    pub use matchforge_protocol::{
        ClientEvent, CloseReason, Codec, ConnectionId, Inbound, JsonCodec, MemberInfo,
        Outbound, RoomId, RoomSnapshot, RoomStatus, ServerEvent, Settings,
    };
    pub use matchforge_room::{RoomConfig, RoomError};
    pub use matchforge_session::{SessionConfig, SessionError};
}
