#![allow(clippy::unwrap_used)]
// Behavioral tests for the fleet orchestrator over scripted channels:
// concurrency policy, state commits, and audit completeness, without
// real sockets. Timing properties run under a paused tokio clock.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::time::Instant;

use minefleet_core::{
    ControlLogStore, DeviceState, DeviceStore, DeviceUpdate, Dispatcher, ExecutionStatus,
    FirmwareDialect, FleetOrchestrator, FleetStores, NewDevice, PriorityGroup, ReadingStore,
    Telemetry, TriggerSource,
};
use minefleet_proto::{
    CommandFrame, ControlChannel, Error as ProtoError, HttpCredentials, ManagementChannel,
};

// ── Scripted fakes ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Call {
    host: String,
    command: String,
    at: Instant,
}

/// Fake fleet: answers with canned frames after a fixed latency, and
/// fails with a timeout for hosts in the unreachable set. Records the
/// start instant of every call for timing assertions.
struct FleetChannel {
    latency: Duration,
    unreachable: HashSet<String>,
    calls: Mutex<Vec<Call>>,
}

impl FleetChannel {
    fn new(latency: Duration) -> Self {
        Self {
            latency,
            unreachable: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn with_unreachable(mut self, hosts: &[&str]) -> Self {
        self.unreachable = hosts.iter().map(|h| (*h).to_owned()).collect();
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn reply(command: &str) -> Value {
        let ok = json!([{ "STATUS": "S", "Msg": "ok" }]);
        match command {
            "stats" => json!({
                "STATUS": ok,
                "STATS": [{ "temp1": 49.0, "temp2": 61.0, "temp3": 74.0, "fan1": 5280, "power": 3275.0 }]
            }),
            "summary" => json!({
                "STATUS": ok,
                "SUMMARY": [{ "GHS 5s": 98000.0, "Elapsed": 86400 }]
            }),
            "pools" => json!({
                "STATUS": ok,
                "POOLS": [{ "URL": "stratum+tcp://pool:3333", "Status": "Alive" }]
            }),
            "logon" => json!({
                "STATUS": ok,
                "SESSION": [{ "SessionID": 7 }]
            }),
            _ => json!({ "STATUS": ok }),
        }
    }
}

#[async_trait]
impl ControlChannel for FleetChannel {
    async fn send(&self, host: &str, port: u16, frame: &CommandFrame) -> Result<Value, ProtoError> {
        self.calls.lock().unwrap().push(Call {
            host: host.to_owned(),
            command: frame.command.clone(),
            at: Instant::now(),
        });
        tokio::time::sleep(self.latency).await;

        if self.unreachable.contains(host) {
            return Err(ProtoError::Timeout {
                host: host.to_owned(),
                port,
                timeout_secs: self.latency.as_secs(),
            });
        }
        Ok(Self::reply(&frame.command))
    }
}

/// Management channel with no reachable endpoint: every reboot goes
/// through the protocol fallback.
struct NoMgmt;

#[async_trait]
impl ManagementChannel for NoMgmt {
    async fn reboot(
        &self,
        _host: &str,
        _port: u16,
        _credentials: Option<&HttpCredentials>,
    ) -> Result<(), ProtoError> {
        Err(ProtoError::Http {
            status: None,
            message: "connection refused".into(),
        })
    }
}

fn fleet(channel: Arc<FleetChannel>) -> (FleetOrchestrator, FleetStores) {
    let stores = FleetStores::new();
    let dispatcher = Dispatcher::new(channel, Arc::new(NoMgmt));
    let orchestrator = FleetOrchestrator::new(
        stores.devices.clone(),
        stores.control_log.clone(),
        stores.readings.clone(),
        dispatcher,
    );
    (orchestrator, stores)
}

fn spec(name: &str, host: &str, dialect: FirmwareDialect, group: PriorityGroup) -> NewDevice {
    NewDevice {
        name: name.into(),
        model: None,
        host: host.into(),
        control_port: 4028,
        mgmt_port: 80,
        dialect,
        credentials: None,
        group,
    }
}

// ── Failure handling and audit trail ────────────────────────────────

#[tokio::test]
async fn sleep_on_unreachable_device_fails_without_state_change() {
    let channel = Arc::new(FleetChannel::new(Duration::ZERO).with_unreachable(&["10.9.9.9"]));
    let (orchestrator, stores) = fleet(channel);

    let device = orchestrator
        .register(spec(
            "ghost",
            "10.9.9.9",
            FirmwareDialect::Luxos,
            PriorityGroup::Low,
        ))
        .unwrap();

    let report = orchestrator.sleep(&[device.id], "test").await.unwrap();

    assert_eq!(report.status, ExecutionStatus::Failed);
    assert_eq!(report.results.len(), 1);
    assert!(!report.results[0].success);
    assert_eq!(report.affected(), 0);

    // Recorded state is unchanged on a failed command.
    let stored = stores.devices.get(device.id).unwrap();
    assert_eq!(stored.state, DeviceState::Mining);

    // Exactly one terminal audit entry for the batch.
    let entry = stores.control_log.get(report.entry_id.unwrap()).unwrap();
    assert_eq!(entry.status, ExecutionStatus::Failed);
    assert!(entry.completed_at.is_some());
}

#[tokio::test]
async fn mixed_batch_aggregates_to_partial() {
    let channel = Arc::new(FleetChannel::new(Duration::ZERO).with_unreachable(&["10.0.0.2"]));
    let (orchestrator, stores) = fleet(channel);

    let up = orchestrator
        .register(spec("up", "10.0.0.1", FirmwareDialect::Vnish, PriorityGroup::Low))
        .unwrap();
    let down = orchestrator
        .register(spec("down", "10.0.0.2", FirmwareDialect::Vnish, PriorityGroup::Low))
        .unwrap();

    let report = orchestrator
        .sleep(&[up.id, down.id], "curtail")
        .await
        .unwrap();

    assert_eq!(report.status, ExecutionStatus::Partial);
    assert_eq!(report.affected(), 1);
    assert_eq!(stores.devices.get(up.id).unwrap().state, DeviceState::Sleeping);
    assert_eq!(stores.devices.get(down.id).unwrap().state, DeviceState::Mining);
}

#[tokio::test]
async fn every_batch_leaves_a_terminal_log_entry() {
    let channel = Arc::new(FleetChannel::new(Duration::ZERO));
    let (orchestrator, stores) = fleet(channel);

    let device = orchestrator
        .register(spec("a", "10.0.0.1", FirmwareDialect::Stock, PriorityGroup::Low))
        .unwrap();

    orchestrator.sleep(&[device.id], "one").await.unwrap();
    orchestrator.wakeup(&[device.id], "two", None).await.unwrap();
    orchestrator.reboot(&[device.id], "three").await.unwrap();
    orchestrator.status(&[device.id]).await.unwrap();

    // Registration plus the four batches.
    let entries = stores.control_log.list();
    assert_eq!(entries.len(), 5);
    for entry in entries {
        assert!(entry.status.is_terminal(), "entry left open: {entry:?}");
        assert!(entry.completed_at.is_some());
    }
}

#[tokio::test]
async fn unknown_target_id_fails_the_whole_batch_before_dispatch() {
    let channel = Arc::new(FleetChannel::new(Duration::ZERO));
    let (orchestrator, _stores) = fleet(Arc::clone(&channel));

    let err = orchestrator
        .sleep(&[uuid::Uuid::new_v4()], "test")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        minefleet_core::CoreError::DeviceNotFound { .. }
    ));
    assert!(channel.calls().is_empty());
}

// ── Batch-sleep semantics ───────────────────────────────────────────

#[tokio::test]
async fn batch_sleep_with_no_matching_devices_is_a_silent_noop() {
    let channel = Arc::new(FleetChannel::new(Duration::ZERO));
    let (orchestrator, stores) = fleet(channel);

    // One critical device; the curtailable set is empty.
    orchestrator
        .register(spec("crit", "10.0.0.1", FirmwareDialect::Stock, PriorityGroup::Critical))
        .unwrap();
    let before = stores.control_log.list().len();

    let report = orchestrator
        .batch_sleep(&[PriorityGroup::Low, PriorityGroup::Curtailable], "price spike")
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.affected(), 0);
    assert!(report.entry_id.is_none());
    // No audit entry for the no-op.
    assert_eq!(stores.control_log.list().len(), before);
}

#[tokio::test]
async fn batch_sleep_targets_mining_devices_and_tags_automation() {
    let channel = Arc::new(FleetChannel::new(Duration::ZERO));
    let (orchestrator, stores) = fleet(channel);

    let eligible = orchestrator
        .register(spec("a", "10.0.0.1", FirmwareDialect::Luxos, PriorityGroup::Curtailable))
        .unwrap();
    let wrong_group = orchestrator
        .register(spec("b", "10.0.0.2", FirmwareDialect::Luxos, PriorityGroup::Critical))
        .unwrap();
    let asleep = orchestrator
        .register(spec("c", "10.0.0.3", FirmwareDialect::Luxos, PriorityGroup::Curtailable))
        .unwrap();
    orchestrator.sleep(&[asleep.id], "pre-sleep").await.unwrap();

    let report = orchestrator
        .batch_sleep(&[PriorityGroup::Curtailable], "price spike")
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.affected(), 1);
    assert_eq!(report.results[0].device_id, eligible.id);

    let entry = stores.control_log.get(report.entry_id.unwrap()).unwrap();
    assert_eq!(entry.source, TriggerSource::Automation);
    assert_eq!(stores.devices.get(wrong_group.id).unwrap().state, DeviceState::Mining);
}

// ── Status polling ──────────────────────────────────────────────────

#[tokio::test]
async fn status_poll_writes_telemetry_reading_and_last_seen() {
    let channel = Arc::new(FleetChannel::new(Duration::ZERO));
    let (orchestrator, stores) = fleet(channel);

    let device = orchestrator
        .register(spec("a", "10.0.0.1", FirmwareDialect::Stock, PriorityGroup::Low))
        .unwrap();

    let report = orchestrator.status(&[device.id]).await.unwrap();
    assert!(report.is_success());

    let stored = stores.devices.get(device.id).unwrap();
    assert_eq!(stored.telemetry.hashrate_ghs, Some(98000.0));
    assert_eq!(stored.telemetry.power_w, Some(3275.0));
    assert!(stored.last_seen.is_some());

    let readings = stores.readings.for_device(device.id);
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0].hashrate_ghs, Some(98000.0));
}

#[tokio::test]
async fn polling_an_unreachable_device_is_idempotent() {
    let channel = Arc::new(FleetChannel::new(Duration::ZERO).with_unreachable(&["10.0.0.1"]));
    let (orchestrator, stores) = fleet(channel);

    let device = orchestrator
        .register(spec("a", "10.0.0.1", FirmwareDialect::Stock, PriorityGroup::Low))
        .unwrap();

    // Seed last-good telemetry directly in the registry.
    let mut seeded = stores.devices.get(device.id).unwrap();
    seeded.telemetry = Telemetry {
        hashrate_ghs: Some(91000.0),
        power_w: Some(3150.0),
        ..Telemetry::default()
    };
    stores.devices.update(seeded).unwrap();

    for _ in 0..3 {
        let report = orchestrator.status(&[device.id]).await.unwrap();
        assert_eq!(report.status, ExecutionStatus::Failed);

        let stored = stores.devices.get(device.id).unwrap();
        assert_eq!(stored.state, DeviceState::Offline);
        // Last good values survive failed polls.
        assert_eq!(stored.telemetry.hashrate_ghs, Some(91000.0));
        assert_eq!(stored.telemetry.power_w, Some(3150.0));
        assert!(stored.last_seen.is_none());
    }
    assert!(stores.readings.for_device(device.id).is_empty());
}

#[tokio::test]
async fn successful_poll_recovers_a_rebooting_device() {
    let channel = Arc::new(FleetChannel::new(Duration::ZERO));
    let (orchestrator, stores) = fleet(channel);

    let device = orchestrator
        .register(spec("a", "10.0.0.1", FirmwareDialect::Stock, PriorityGroup::Low))
        .unwrap();

    orchestrator.reboot(&[device.id], "maintenance").await.unwrap();
    assert_eq!(stores.devices.get(device.id).unwrap().state, DeviceState::Rebooting);

    orchestrator.status(&[device.id]).await.unwrap();
    assert_eq!(stores.devices.get(device.id).unwrap().state, DeviceState::Mining);
}

#[tokio::test]
async fn reboot_marks_rebooting_even_when_the_attempt_fails() {
    let channel = Arc::new(FleetChannel::new(Duration::ZERO).with_unreachable(&["10.0.0.1"]));
    let (orchestrator, stores) = fleet(channel);

    let device = orchestrator
        .register(spec("a", "10.0.0.1", FirmwareDialect::Stock, PriorityGroup::Low))
        .unwrap();

    let report = orchestrator.reboot(&[device.id], "maintenance").await.unwrap();

    assert_eq!(report.status, ExecutionStatus::Failed);
    // Optimistic transient state, set before the attempt.
    assert_eq!(stores.devices.get(device.id).unwrap().state, DeviceState::Rebooting);
}

// ── Concurrency policy (paused clock) ───────────────────────────────

#[tokio::test(start_paused = true)]
async fn sleep_fans_out_in_parallel() {
    let channel = Arc::new(FleetChannel::new(Duration::from_secs(2)));
    let (orchestrator, _stores) = fleet(Arc::clone(&channel));

    let mut ids = Vec::new();
    for i in 0..4 {
        let device = orchestrator
            .register(spec(
                &format!("d{i}"),
                &format!("10.0.0.{}", i + 1),
                FirmwareDialect::Vnish,
                PriorityGroup::Low,
            ))
            .unwrap();
        ids.push(device.id);
    }

    let started = Instant::now();
    orchestrator.sleep(&ids, "parallel").await.unwrap();

    // Wall time is the max per-device latency, not the sum.
    let elapsed = started.elapsed();
    assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");

    // Every attempt started at the same paused-clock instant.
    let calls = channel.calls();
    assert_eq!(calls.len(), 4);
    assert!(calls.iter().all(|c| c.at == calls[0].at));
}

#[tokio::test(start_paused = true)]
async fn one_slow_device_does_not_delay_a_status_batch() {
    let channel = Arc::new(
        FleetChannel::new(Duration::from_secs(10)).with_unreachable(&["10.0.0.2"]),
    );
    let (orchestrator, stores) = fleet(channel);

    let fast = orchestrator
        .register(spec("fast", "10.0.0.1", FirmwareDialect::Stock, PriorityGroup::Low))
        .unwrap();
    let slow = orchestrator
        .register(spec("slow", "10.0.0.2", FirmwareDialect::Stock, PriorityGroup::Low))
        .unwrap();

    let started = Instant::now();
    let report = orchestrator.status(&[fast.id, slow.id]).await.unwrap();

    // Both ran concurrently against the 10s scripted latency.
    assert!(started.elapsed() < Duration::from_secs(11));
    assert_eq!(report.status, ExecutionStatus::Partial);
    assert_eq!(stores.devices.get(slow.id).unwrap().state, DeviceState::Offline);
}

#[tokio::test(start_paused = true)]
async fn wakeup_staggers_sequentially() {
    let stagger = Duration::from_secs(5);
    let channel = Arc::new(FleetChannel::new(Duration::from_secs(1)));
    let (orchestrator, _stores) = fleet(Arc::clone(&channel));

    let mut ids = Vec::new();
    for i in 0..3 {
        let device = orchestrator
            .register(spec(
                &format!("d{i}"),
                &format!("10.0.0.{}", i + 1),
                FirmwareDialect::Stock,
                PriorityGroup::Low,
            ))
            .unwrap();
        ids.push(device.id);
    }

    orchestrator
        .wakeup(&ids, "staggered", Some(stagger))
        .await
        .unwrap();

    let calls = channel.calls();
    assert_eq!(calls.len(), 3);
    for pair in calls.windows(2) {
        // Next device is only contacted after the previous attempt
        // completed and the stagger interval elapsed.
        let gap = pair[1].at.duration_since(pair[0].at);
        assert!(gap >= stagger, "gap was {gap:?}");
    }
}

// ── Registry CRUD through the facade ────────────────────────────────

#[tokio::test]
async fn register_rejects_duplicate_endpoint() {
    let channel = Arc::new(FleetChannel::new(Duration::ZERO));
    let (orchestrator, _stores) = fleet(channel);

    orchestrator
        .register(spec("a", "10.0.0.1", FirmwareDialect::Stock, PriorityGroup::Low))
        .unwrap();
    let err = orchestrator
        .register(spec("b", "10.0.0.1", FirmwareDialect::Stock, PriorityGroup::Low))
        .unwrap_err();

    assert!(matches!(
        err,
        minefleet_core::CoreError::DuplicateEndpoint { .. }
    ));
}

#[tokio::test]
async fn update_and_delete_leave_audit_entries() {
    let channel = Arc::new(FleetChannel::new(Duration::ZERO));
    let (orchestrator, stores) = fleet(channel);

    let device = orchestrator
        .register(spec("a", "10.0.0.1", FirmwareDialect::Stock, PriorityGroup::Low))
        .unwrap();

    let updated = orchestrator
        .update(
            device.id,
            DeviceUpdate {
                group: Some(PriorityGroup::Curtailable),
                ..DeviceUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(updated.group, PriorityGroup::Curtailable);

    orchestrator.delete(device.id).unwrap();
    assert!(stores.devices.get(device.id).is_none());

    // Register, update, delete: three closed entries, all retained.
    let entries = stores.control_log.list();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.completed_at.is_some()));
}
