// ── Control channel framing ──
//
// One request frame per connection: a single-line JSON object with a
// `command` field and an optional `parameter` field, no trailing newline.
// Responses are JSON terminated by NUL byte(s), which must be stripped
// before parsing.

use serde::Serialize;
use serde_json::Value;

use crate::error::Error;

/// A single control-channel request frame.
///
/// `{"command":"summary"}` or `{"command":"ascset","parameter":"0,freq,0"}`.
/// The encoded form never contains a newline -- the protocol is
/// one-frame-per-connection, not line-delimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandFrame {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

impl CommandFrame {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            parameter: None,
        }
    }

    pub fn with_parameter(command: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            parameter: Some(parameter.into()),
        }
    }

    /// Encode to the on-wire byte form (compact JSON, newline-free).
    pub fn encode(&self) -> Vec<u8> {
        // Compact serde_json output cannot contain newlines for these
        // field types, so the newline-free invariant holds by construction.
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Strip trailing NUL frame terminators and surrounding whitespace from a
/// raw response buffer, then parse the remaining text as a JSON value.
pub fn decode_response(raw: &[u8]) -> Result<Value, Error> {
    let end = raw
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |pos| pos + 1);
    let trimmed = &raw[..end];

    let text = std::str::from_utf8(trimmed)
        .map_err(|e| Error::decode(format!("response is not UTF-8: {e}"), ""))?
        .trim();

    serde_json::from_str(text).map_err(|e| Error::decode(format!("invalid JSON frame: {e}"), text))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn encode_without_parameter_omits_field() {
        let frame = CommandFrame::new("summary");
        assert_eq!(frame.encode(), br#"{"command":"summary"}"#);
    }

    #[test]
    fn encode_with_parameter() {
        let frame = CommandFrame::with_parameter("curtail", "sleep");
        assert_eq!(
            frame.encode(),
            br#"{"command":"curtail","parameter":"sleep"}"#
        );
    }

    #[test]
    fn encoded_frame_is_newline_free() {
        let frame = CommandFrame::with_parameter("ascset", "0,freq,0");
        assert!(!frame.encode().contains(&b'\n'));
    }

    #[test]
    fn decode_strips_trailing_nuls() {
        let raw = b"{\"STATUS\":[{\"STATUS\":\"S\"}]}\x00\x00";
        let value = decode_response(raw).unwrap();
        assert!(value.get("STATUS").is_some());
    }

    #[test]
    fn decode_rejects_non_json() {
        let raw = b"not json at all\x00";
        let err = decode_response(raw).unwrap_err();
        assert!(err.is_decode(), "expected decode error, got {err:?}");
    }

    #[test]
    fn decode_preserves_interior_content() {
        let raw = b"  {\"command\":\"ok\"} \x00";
        let value = decode_response(raw).unwrap();
        assert_eq!(value["command"], "ok");
    }
}
