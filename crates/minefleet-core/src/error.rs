// ── Core error types ──
//
// Per-device protocol failures never surface here: the dispatcher folds
// them into structured per-device results so batch aggregation stays
// uniform. `CoreError` covers the hard failures only -- registry
// resolution, validation, and fleet-data persistence.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("device not found: {id}")]
    DeviceNotFound { id: Uuid },

    #[error("a registered device already occupies {endpoint}")]
    DuplicateEndpoint { endpoint: String },

    #[error("invalid {field}: {reason}")]
    Validation {
        field: &'static str,
        reason: String,
    },

    #[error("fleet data I/O failure at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("fleet data at {path} is not valid JSON")]
    Data {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CoreError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}
