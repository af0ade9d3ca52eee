//! Validation of untrusted client input.

use serde::Serialize;
use serde_json::Value;

use crate::SessionError;

/// Name given to players who never set one, or whose name sanitized away.
pub const DEFAULT_NAME: &str = "Anonymous";

/// Normalizes a client-supplied display name.
///
/// Keeps only `[A-Za-z0-9 _-]`, trims surrounding spaces, and truncates
/// to `max_len` characters. Anything that is not a JSON string, or that
/// ends up empty, becomes [`DEFAULT_NAME`]. Never fails.
pub fn sanitize_name(raw: Option<&Value>, max_len: usize) -> String {
    let Some(Value::String(raw)) = raw else {
        return DEFAULT_NAME.to_string();
    };

    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let name: String = kept.trim().chars().take(max_len).collect();

    if name.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        name
    }
}

#[derive(Serialize)]
struct RelayedBody<'a> {
    #[serde(rename = "type")]
    kind: &'a Value,
    data: &'a Value,
}

/// Checks the JSON-encoded size of a relayed `{type, data}` body.
///
/// Returns the encoded size on success.
pub fn check_payload_size(
    kind: &Value,
    data: &Value,
    max: usize,
) -> Result<usize, SessionError> {
    let size = serde_json::to_vec(&RelayedBody { kind, data })
        .map(|bytes| bytes.len())
        .unwrap_or(usize::MAX);
    if size > max {
        return Err(SessionError::PayloadTooLarge { size, max });
    }
    Ok(size)
}
