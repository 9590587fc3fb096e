//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use minefleet_config::ConfigError;
use minefleet_core::CoreError;

/// Exit codes per the CLI contract.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    /// At least one device in the batch failed.
    pub const PARTIAL: i32 = 10;
    /// Every device in the batch failed.
    pub const FAILED: i32 = 11;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Resources ────────────────────────────────────────────────────

    #[error("device '{identifier}' not found")]
    #[diagnostic(
        code(minefleet::not_found),
        help("Run: minefleet devices list to see registered devices")
    )]
    DeviceNotFound { identifier: String },

    #[error("audit entry '{identifier}' not found")]
    #[diagnostic(
        code(minefleet::log_entry_not_found),
        help("Run: minefleet log list to see recent entries")
    )]
    LogEntryNotFound { identifier: String },

    #[error("a registered device already occupies {endpoint}")]
    #[diagnostic(
        code(minefleet::conflict),
        help("Each device needs a unique host and control-port pair.")
    )]
    DuplicateEndpoint { endpoint: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("invalid value for {field}: {reason}")]
    #[diagnostic(code(minefleet::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("no profile named '{profile}' in the config file")]
    #[diagnostic(
        code(minefleet::profile_not_found),
        help("List configured profiles with: minefleet config profiles")
    )]
    ProfileNotFound { profile: String },

    #[error("configuration error")]
    #[diagnostic(code(minefleet::config))]
    Config(#[source] ConfigError),

    // ── Fleet data ───────────────────────────────────────────────────

    #[error("failed to read or write fleet data")]
    #[diagnostic(
        code(minefleet::data),
        help("Check the data file path and permissions, or set data_file in your profile.")
    )]
    Data(#[source] CoreError),

    // ── Channels ─────────────────────────────────────────────────────

    #[error("failed to initialize the management HTTP client")]
    #[diagnostic(code(minefleet::http_client))]
    HttpClient(#[source] minefleet_proto::Error),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(minefleet::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid JSON payload: {0}")]
    #[diagnostic(code(minefleet::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::DeviceNotFound { .. } | Self::LogEntryNotFound { .. } => exit_code::NOT_FOUND,
            Self::DuplicateEndpoint { .. } => exit_code::CONFLICT,
            Self::Validation { .. }
            | Self::ProfileNotFound { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DeviceNotFound { id } => Self::DeviceNotFound {
                identifier: id.to_string(),
            },
            CoreError::DuplicateEndpoint { endpoint } => Self::DuplicateEndpoint { endpoint },
            CoreError::Validation { field, reason } => Self::Validation {
                field: field.into(),
                reason,
            },
            err @ (CoreError::Io { .. } | CoreError::Data { .. }) => Self::Data(err),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownProfile { profile } => Self::ProfileNotFound { profile },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            err => Self::Config(err),
        }
    }
}
