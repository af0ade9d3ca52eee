//! Error types for the protocol layer.

/// A frame could not be turned into bytes or back.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Malformed JSON, a field of the wrong type, or an unknown event name.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// An encoded frame was not valid UTF-8 and cannot go out as text.
    #[error("frame is not text: {0}")]
    NotText(#[from] std::string::FromUtf8Error),
}
