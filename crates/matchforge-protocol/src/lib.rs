//! Wire protocol for Matchforge.
//!
//! - **Types** ([`Inbound`], [`Outbound`], [`ClientEvent`], [`ServerEvent`],
//!   [`RoomSnapshot`]): the named events clients and the matchmaker
//!   exchange.
//! - **Codec** ([`Codec`], [`JsonCodec`]): how frames become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (Inbound/Outbound) → Matchmaker
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use matchforge_transport::ConnectionId;
pub use types::{
    ClientEvent, CloseReason, Inbound, MemberInfo, Outbound, RoomId,
    RoomSnapshot, RoomStatus, ServerEvent, Settings,
};
