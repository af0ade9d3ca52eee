//! Player sessions for Matchforge.
//!
//! - **Identity sanitizing**: untrusted display names and message sizes
//!   ([`sanitize_name`], [`check_payload_size`])
//! - **Player registry**: one [`Player`] per live connection
//!   ([`PlayerRegistry`])
//!
//! ```text
//! Room layer (above)  ← reads/writes a player's current room
//!     ↕
//! Session layer (this crate)
//!     ↕
//! Protocol layer (below)  ← ConnectionId, RoomId, Outbound
//! ```

mod error;
mod player;
mod registry;
mod sanitize;

pub use error::SessionError;
pub use player::{Player, PlayerSender, SessionConfig};
pub use registry::PlayerRegistry;
pub use sanitize::{DEFAULT_NAME, check_payload_size, sanitize_name};
