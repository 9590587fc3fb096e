// ── Fleet orchestration ──
//
// Fans batch intents out to the dispatcher per device, applying the
// intent's concurrency policy: unordered parallel for status and sleep,
// strictly sequential with a stagger delay for wakeup (bounded inrush
// current on the shared electrical circuit).
//
// Every batch opens one control log entry `in_progress` and finalizes
// it exactly once with the aggregate status derived from per-device
// outcomes. A device's recorded state is committed only on confirmed
// command success, with two exceptions: `rebooting` is set
// optimistically before the attempt (the device goes unreachable
// either way), and a failed poll marks the device `offline` or
// `error` depending on the failure class.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dispatch::{DispatchOutcome, Dispatcher, FailureClass};
use crate::error::CoreError;
use crate::model::{
    ControlLogEntry, Device, DeviceResult, DeviceState, DeviceUpdate, ExecutionStatus, Intent,
    NewDevice, PowerReading, PriorityGroup, TriggerSource,
};
use crate::stats::{self, FleetStats};
use crate::store::{ControlLogStore, DeviceStore, ReadingStore};

/// Default delay between consecutive wake attempts.
pub const DEFAULT_WAKE_STAGGER: Duration = Duration::from_secs(5);

/// Result of one batch operation: the audit entry it produced (if any),
/// the derived aggregate status, and one result per requested device.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub entry_id: Option<Uuid>,
    pub intent: Intent,
    pub status: ExecutionStatus,
    pub results: Vec<DeviceResult>,
}

impl BatchReport {
    /// Devices whose attempt succeeded.
    pub fn affected(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, ExecutionStatus::Success)
    }

    /// Empty-target short circuit: reported success, no audit entry.
    fn noop(intent: Intent) -> Self {
        Self {
            entry_id: None,
            intent,
            status: ExecutionStatus::Success,
            results: Vec::new(),
        }
    }
}

/// The subsystem facade: registry CRUD, batch command execution, and
/// the fleet-wide stats projection.
#[derive(Clone)]
pub struct FleetOrchestrator {
    devices: Arc<dyn DeviceStore>,
    control_log: Arc<dyn ControlLogStore>,
    readings: Arc<dyn ReadingStore>,
    dispatcher: Dispatcher,
    wake_stagger: Duration,
}

impl FleetOrchestrator {
    pub fn new(
        devices: Arc<dyn DeviceStore>,
        control_log: Arc<dyn ControlLogStore>,
        readings: Arc<dyn ReadingStore>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            devices,
            control_log,
            readings,
            dispatcher,
            wake_stagger: DEFAULT_WAKE_STAGGER,
        }
    }

    /// Override the default wake stagger (config profiles).
    #[must_use]
    pub fn with_wake_stagger(mut self, stagger: Duration) -> Self {
        self.wake_stagger = stagger;
        self
    }

    // ── Registry surface ─────────────────────────────────────────

    pub fn list(&self) -> Vec<Device> {
        self.devices.list()
    }

    pub fn get(&self, id: Uuid) -> Result<Device, CoreError> {
        self.devices.get(id).ok_or(CoreError::DeviceNotFound { id })
    }

    pub fn register(&self, spec: NewDevice) -> Result<Device, CoreError> {
        validate(&spec.name, &spec.host, spec.control_port)?;

        let device = spec.into_device();
        self.devices.insert(device.clone())?;
        self.control_log.append(ControlLogEntry::closed(
            vec![device.id],
            Intent::Register,
            TriggerSource::Manual,
            format!("registered {}", device.name),
            ExecutionStatus::Success,
        ));

        info!(device = %device.name, endpoint = %device.endpoint(), "device registered");
        Ok(device)
    }

    pub fn update(&self, id: Uuid, patch: DeviceUpdate) -> Result<Device, CoreError> {
        let mut device = self.get(id)?;
        patch.apply(&mut device);
        validate(&device.name, &device.host, device.control_port)?;

        self.devices.update(device.clone())?;
        self.control_log.append(ControlLogEntry::closed(
            vec![id],
            Intent::UpdateConfig,
            TriggerSource::Manual,
            format!("updated {}", device.name),
            ExecutionStatus::Success,
        ));
        Ok(device)
    }

    pub fn delete(&self, id: Uuid) -> Result<Device, CoreError> {
        let device = self
            .devices
            .remove(id)
            .ok_or(CoreError::DeviceNotFound { id })?;

        // Log entries referencing the device are retained for audit.
        self.control_log.append(ControlLogEntry::closed(
            vec![id],
            Intent::Delete,
            TriggerSource::Manual,
            format!("deleted {}", device.name),
            ExecutionStatus::Success,
        ));
        Ok(device)
    }

    /// Fleet-wide counts and totals from the current registry snapshot.
    pub fn stats(&self) -> FleetStats {
        stats::aggregate(&self.devices.list())
    }

    // ── Batch surface ────────────────────────────────────────────

    /// Poll every target in parallel. Devices that answer get a fresh
    /// power reading, updated telemetry, and `last_seen`; devices that
    /// fail are marked `offline` (transport) or `error` (protocol)
    /// with telemetry left at its last good values.
    pub async fn status(&self, ids: &[Uuid]) -> Result<BatchReport, CoreError> {
        let targets = self.resolve(ids)?;
        if targets.is_empty() {
            return Ok(BatchReport::noop(Intent::Status));
        }

        let entry_id = self.open(&targets, Intent::Status, TriggerSource::Manual, "status poll");
        let outcomes = join_all(targets.iter().map(|d| self.dispatcher.read_stats(d))).await;

        let now = Utc::now();
        let mut results = Vec::with_capacity(targets.len());
        for (device, outcome) in targets.iter().zip(&outcomes) {
            let mut updated = device.clone();
            if outcome.success {
                if let Some(telemetry) = &outcome.telemetry {
                    self.readings
                        .append(PowerReading::sample(device.id, telemetry, now));
                    updated.telemetry = telemetry.clone();
                }
                updated.last_seen = Some(now);
                if updated.state.is_recoverable() {
                    updated.state = DeviceState::Mining;
                }
            } else {
                updated.state = match outcome.failure {
                    Some(FailureClass::Protocol) => DeviceState::Error,
                    _ => DeviceState::Offline,
                };
            }
            self.commit(updated);
            results.push(to_result(device, outcome));
        }

        Ok(self.finish(entry_id, Intent::Status, results))
    }

    /// Sleep every target in parallel. No physical risk from
    /// simultaneous shutdown.
    pub async fn sleep(&self, ids: &[Uuid], reason: &str) -> Result<BatchReport, CoreError> {
        let targets = self.resolve(ids)?;
        if targets.is_empty() {
            return Ok(BatchReport::noop(Intent::Sleep));
        }
        Ok(self
            .run_sleep(targets, Intent::Sleep, TriggerSource::Manual, reason)
            .await)
    }

    /// Wake targets strictly sequentially with a stagger delay between
    /// devices: device i is not contacted until device i-1's attempt
    /// has completed and the stagger interval has elapsed.
    pub async fn wakeup(
        &self,
        ids: &[Uuid],
        reason: &str,
        stagger: Option<Duration>,
    ) -> Result<BatchReport, CoreError> {
        let targets = self.resolve(ids)?;
        if targets.is_empty() {
            return Ok(BatchReport::noop(Intent::Wakeup));
        }
        let stagger = stagger.unwrap_or(self.wake_stagger);

        let entry_id = self.open(&targets, Intent::Wakeup, TriggerSource::Manual, reason);
        let mut results = Vec::with_capacity(targets.len());
        for (i, device) in targets.iter().enumerate() {
            if i > 0 {
                sleep(stagger).await;
            }
            let outcome = self.dispatcher.wake(device).await;
            if outcome.success {
                let mut updated = device.clone();
                updated.state = DeviceState::Mining;
                self.commit(updated);
            }
            results.push(to_result(device, &outcome));
        }

        Ok(self.finish(entry_id, Intent::Wakeup, results))
    }

    /// Reboot every target, management channel preferred. Every target
    /// is optimistically marked `rebooting` before any command goes
    /// out; the next successful poll confirms it back to `mining`.
    pub async fn reboot(&self, ids: &[Uuid], reason: &str) -> Result<BatchReport, CoreError> {
        let targets = self.resolve(ids)?;
        if targets.is_empty() {
            return Ok(BatchReport::noop(Intent::Reboot));
        }

        let entry_id = self.open(&targets, Intent::Reboot, TriggerSource::Manual, reason);
        for device in &targets {
            let mut updated = device.clone();
            updated.state = DeviceState::Rebooting;
            self.commit(updated);
        }

        let outcomes = join_all(targets.iter().map(|d| self.dispatcher.reboot(d))).await;
        let results = targets
            .iter()
            .zip(&outcomes)
            .map(|(device, outcome)| to_result(device, outcome))
            .collect();

        Ok(self.finish(entry_id, Intent::Reboot, results))
    }

    /// Demand-response entry point: sleep every `mining` device whose
    /// priority group is in `groups`. Short-circuits as a no-op --
    /// without creating an audit entry -- when nothing matches.
    pub async fn batch_sleep(
        &self,
        groups: &[PriorityGroup],
        reason: &str,
    ) -> Result<BatchReport, CoreError> {
        let targets = self.devices.mining_in_groups(groups);
        if targets.is_empty() {
            debug!(?groups, "no mining devices in requested groups");
            return Ok(BatchReport::noop(Intent::BatchSleep));
        }
        Ok(self
            .run_sleep(targets, Intent::BatchSleep, TriggerSource::Automation, reason)
            .await)
    }

    // ── Internals ────────────────────────────────────────────────

    /// Resolve explicit target ids. Any unknown id fails the whole
    /// operation before anything is dispatched.
    fn resolve(&self, ids: &[Uuid]) -> Result<Vec<Device>, CoreError> {
        ids.iter().map(|&id| self.get(id)).collect()
    }

    async fn run_sleep(
        &self,
        targets: Vec<Device>,
        intent: Intent,
        source: TriggerSource,
        reason: &str,
    ) -> BatchReport {
        let entry_id = self.open(&targets, intent, source, reason);
        let outcomes = join_all(targets.iter().map(|d| self.dispatcher.sleep(d))).await;

        let mut results = Vec::with_capacity(targets.len());
        for (device, outcome) in targets.iter().zip(&outcomes) {
            if outcome.success {
                let mut updated = device.clone();
                updated.state = DeviceState::Sleeping;
                self.commit(updated);
            }
            results.push(to_result(device, outcome));
        }

        self.finish(entry_id, intent, results)
    }

    fn open(
        &self,
        targets: &[Device],
        intent: Intent,
        source: TriggerSource,
        reason: &str,
    ) -> Uuid {
        let entry = ControlLogEntry::open(
            targets.iter().map(|d| d.id).collect(),
            intent,
            source,
            reason,
        );
        let id = entry.id;
        self.control_log.append(entry);
        id
    }

    fn finish(&self, entry_id: Uuid, intent: Intent, results: Vec<DeviceResult>) -> BatchReport {
        let status = ExecutionStatus::aggregate(&results);
        self.control_log.finalize(entry_id, results.clone());
        info!(%intent, %status, targets = results.len(), "batch complete");

        BatchReport {
            entry_id: Some(entry_id),
            intent,
            status,
            results,
        }
    }

    /// Best-effort state commit. A device deleted mid-batch is not a
    /// reason to abort finalizing the audit entry.
    fn commit(&self, device: Device) {
        if let Err(error) = self.devices.update(device) {
            warn!(%error, "failed to commit device state");
        }
    }
}

fn to_result(device: &Device, outcome: &DispatchOutcome) -> DeviceResult {
    DeviceResult {
        device_id: device.id,
        success: outcome.success,
        degraded: outcome.degraded,
        message: outcome.message.clone(),
    }
}

fn validate(name: &str, host: &str, control_port: u16) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::validation("name", "must not be empty"));
    }
    if host.trim().is_empty() {
        return Err(CoreError::validation("host", "must not be empty"));
    }
    if control_port == 0 {
        return Err(CoreError::validation("control_port", "must be non-zero"));
    }
    Ok(())
}
