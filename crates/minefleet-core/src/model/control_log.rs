// ── Control log domain types ──
//
// Append-only audit trail: one entry per batch or single-device command
// invocation. Entries are opened `in_progress` and finalized exactly
// once with a terminal status derived from per-device outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// What a control log entry records having been attempted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Intent {
    Register,
    UpdateConfig,
    Delete,
    Sleep,
    Wakeup,
    Reboot,
    BatchSleep,
    Status,
}

/// Who initiated the command.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TriggerSource {
    Manual,
    Automation,
}

/// Execution status of a control log entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExecutionStatus {
    InProgress,
    Success,
    Partial,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }

    /// Derive the aggregate status from per-device outcomes: `success`
    /// iff every device succeeded, `failed` iff every device failed,
    /// `partial` otherwise. Never independently decided.
    pub fn aggregate(results: &[DeviceResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        if succeeded == results.len() {
            Self::Success
        } else if succeeded == 0 {
            Self::Failed
        } else {
            Self::Partial
        }
    }
}

/// Outcome of one device's attempt within a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceResult {
    pub device_id: Uuid,
    pub success: bool,
    /// The command succeeded but with weaker semantics than requested
    /// (stock-firmware sleep is a restart, not a low-power state).
    #[serde(default)]
    pub degraded: bool,
    pub message: String,
}

/// One audit record. `completed_at` is `None` exactly while the entry
/// is `in_progress`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlLogEntry {
    pub id: Uuid,
    pub targets: Vec<Uuid>,
    pub intent: Intent,
    pub source: TriggerSource,
    pub reason: String,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub results: Vec<DeviceResult>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ControlLogEntry {
    /// Open an `in_progress` entry at the start of a batch.
    pub fn open(
        targets: Vec<Uuid>,
        intent: Intent,
        source: TriggerSource,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            targets,
            intent,
            source,
            reason: reason.into(),
            status: ExecutionStatus::InProgress,
            results: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Record a single-shot registry mutation that is already terminal
    /// at creation time (register / update / delete).
    pub fn closed(
        targets: Vec<Uuid>,
        intent: Intent,
        source: TriggerSource,
        reason: impl Into<String>,
        status: ExecutionStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            targets,
            intent,
            source,
            reason: reason.into(),
            status,
            results: Vec::new(),
            created_at: now,
            completed_at: Some(now),
        }
    }

    /// Close the entry with per-device results and the derived
    /// aggregate status. Sets `completed_at`.
    pub fn finalize(&mut self, results: Vec<DeviceResult>) {
        self.status = ExecutionStatus::aggregate(&results);
        self.results = results;
        self.completed_at = Some(Utc::now());
    }
}
