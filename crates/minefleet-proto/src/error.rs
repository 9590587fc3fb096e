use thiserror::Error;

/// Top-level error type for the `minefleet-proto` crate.
///
/// Covers every failure mode across both device surfaces: the framed TCP
/// control channel and the HTTP management channel. `minefleet-core`
/// folds these into per-device outcomes -- a proto error never aborts a
/// batch on its own.
#[derive(Debug, Error)]
pub enum Error {
    // ── Control channel transport ───────────────────────────────────
    /// Connection refused, reset, or closed before any response byte.
    #[error("control channel transport error ({host}:{port}): {source}")]
    Transport {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// The device accepted the connection but produced no complete
    /// response within the read timeout.
    #[error("control channel timed out after {timeout_secs}s ({host}:{port})")]
    Timeout {
        host: String,
        port: u16,
        timeout_secs: u64,
    },

    /// The device closed the connection without sending a single byte.
    #[error("connection closed before any response data ({host}:{port})")]
    EmptyResponse { host: String, port: u16 },

    // ── Frame decoding ──────────────────────────────────────────────
    /// Response received but not parseable as the expected frame shape.
    /// Carries a preview of the raw body for debugging.
    #[error("frame decode error: {message}")]
    Decode { message: String, preview: String },

    /// The device answered with an error status line instead of a payload.
    #[error("command rejected by device: {message}")]
    Rejected { message: String },

    // ── Management channel ──────────────────────────────────────────
    /// HTTP management request failed (transport or non-success status).
    #[error("management channel error{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Http { status: Option<u16>, message: String },
}

impl Error {
    /// Build a [`Error::Decode`] with a truncated body preview, so logs
    /// stay readable even when a device emits garbage.
    pub(crate) fn decode(message: impl Into<String>, body: &str) -> Self {
        let preview = body.chars().take(200).collect();
        Self::Decode {
            message: message.into(),
            preview,
        }
    }

    /// Returns `true` for network-layer failures (refused, timed out,
    /// closed early). Devices are frequently unreachable by design, so
    /// callers treat these as expected per-device outcomes.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Timeout { .. } | Self::EmptyResponse { .. }
        )
    }

    /// Returns `true` if a response arrived but could not be understood.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::Rejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_preview_is_truncated() {
        let body = "x".repeat(500);
        let err = Error::decode("bad frame", &body);
        match err {
            Error::Decode { preview, .. } => assert_eq!(preview.len(), 200),
            other => panic!("expected Decode, got {other:?}"),
        }
    }

    #[test]
    fn transport_classification() {
        let err = Error::Timeout {
            host: "10.0.0.9".into(),
            port: 4028,
            timeout_secs: 10,
        };
        assert!(err.is_transport());
        assert!(!err.is_decode());
    }
}
