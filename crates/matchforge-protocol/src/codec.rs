//! Codec trait and the JSON implementation.
//!
//! Clients are browsers, so frames travel as JSON text. The [`Codec`]
//! trait keeps the coordinator independent of that choice.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes them back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Serializes a value into a text frame.
    fn encode_text<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        Ok(String::from_utf8(self.encode(value)?)?)
    }
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ```rust
/// use matchforge_protocol::{ClientEvent, Codec, Inbound, JsonCodec};
///
/// let codec = JsonCodec;
/// let frame: Inbound = codec
///     .decode(br#"{"event":{"type":"leave-room"}}"#)
///     .unwrap();
/// assert_eq!(frame.event, ClientEvent::LeaveRoom {});
/// assert_eq!(frame.ack, None);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
