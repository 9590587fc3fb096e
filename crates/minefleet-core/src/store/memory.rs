// ── In-memory fleet stores ──
//
// Lock-free concurrent storage over `DashMap`. Each per-device update
// is scoped to that device's entry; overlapping batches targeting the
// same device race last-writer-wins, which is acceptable because
// operational state is idempotently re-derived on the next poll.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::warn;
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{ControlLogEntry, Device, DeviceResult, PowerReading, PriorityGroup};
use crate::store::persist::FleetSnapshot;
use crate::store::{ControlLogStore, DeviceStore, ReadingStore};

// ── Devices ─────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryDeviceStore {
    by_id: DashMap<Uuid, Device>,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Endpoint-uniqueness scan, excluding the device being written.
    fn endpoint_taken(&self, device: &Device) -> bool {
        let endpoint = device.endpoint();
        self.by_id
            .iter()
            .any(|entry| entry.id != device.id && entry.endpoint() == endpoint)
    }
}

impl DeviceStore for MemoryDeviceStore {
    fn list(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.by_id.iter().map(|e| e.value().clone()).collect();
        devices.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        devices
    }

    fn get(&self, id: Uuid) -> Option<Device> {
        self.by_id.get(&id).map(|e| e.value().clone())
    }

    fn insert(&self, device: Device) -> Result<(), CoreError> {
        if self.endpoint_taken(&device) {
            return Err(CoreError::DuplicateEndpoint {
                endpoint: device.endpoint(),
            });
        }
        self.by_id.insert(device.id, device);
        Ok(())
    }

    fn update(&self, device: Device) -> Result<(), CoreError> {
        if !self.by_id.contains_key(&device.id) {
            return Err(CoreError::DeviceNotFound { id: device.id });
        }
        if self.endpoint_taken(&device) {
            return Err(CoreError::DuplicateEndpoint {
                endpoint: device.endpoint(),
            });
        }
        self.by_id.insert(device.id, device);
        Ok(())
    }

    fn remove(&self, id: Uuid) -> Option<Device> {
        self.by_id.remove(&id).map(|(_, device)| device)
    }

    fn mining_in_groups(&self, groups: &[PriorityGroup]) -> Vec<Device> {
        let mut devices: Vec<Device> = self
            .by_id
            .iter()
            .filter(|e| e.state.is_mining() && groups.contains(&e.group))
            .map(|e| e.value().clone())
            .collect();
        devices.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        devices
    }
}

// ── Control log ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryControlLogStore {
    by_id: DashMap<Uuid, ControlLogEntry>,
}

impl MemoryControlLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ControlLogStore for MemoryControlLogStore {
    fn append(&self, entry: ControlLogEntry) {
        self.by_id.insert(entry.id, entry);
    }

    fn finalize(&self, id: Uuid, results: Vec<DeviceResult>) {
        match self.by_id.get_mut(&id) {
            Some(mut entry) => entry.finalize(results),
            None => warn!(entry_id = %id, "finalize for unknown control log entry"),
        }
    }

    fn get(&self, id: Uuid) -> Option<ControlLogEntry> {
        self.by_id.get(&id).map(|e| e.value().clone())
    }

    fn list(&self) -> Vec<ControlLogEntry> {
        let mut entries: Vec<ControlLogEntry> =
            self.by_id.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        entries
    }
}

// ── Power readings ──────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryReadingStore {
    by_device: DashMap<Uuid, Vec<PowerReading>>,
}

impl MemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn all(&self) -> Vec<PowerReading> {
        let mut readings: Vec<PowerReading> = self
            .by_device
            .iter()
            .flat_map(|e| e.value().clone())
            .collect();
        readings.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));
        readings
    }
}

impl ReadingStore for MemoryReadingStore {
    fn append(&self, reading: PowerReading) {
        self.by_device
            .entry(reading.device_id)
            .or_default()
            .push(reading);
    }

    fn for_device(&self, device_id: Uuid) -> Vec<PowerReading> {
        self.by_device
            .get(&device_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }
}

// ── Bundle ──────────────────────────────────────────────────────────

/// The three in-memory collections, ready to hand to the orchestrator
/// and to snapshot to disk between invocations.
#[derive(Debug, Default, Clone)]
pub struct FleetStores {
    pub devices: Arc<MemoryDeviceStore>,
    pub control_log: Arc<MemoryControlLogStore>,
    pub readings: Arc<MemoryReadingStore>,
}

impl FleetStores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate from a persisted snapshot.
    pub fn from_snapshot(snapshot: FleetSnapshot) -> Self {
        let stores = Self::new();
        for device in snapshot.devices {
            stores.devices.by_id.insert(device.id, device);
        }
        for entry in snapshot.control_log {
            stores.control_log.by_id.insert(entry.id, entry);
        }
        for reading in snapshot.readings {
            stores
                .readings
                .by_device
                .entry(reading.device_id)
                .or_default()
                .push(reading);
        }
        stores
    }

    /// Capture the current contents for persistence.
    pub fn snapshot(&self) -> FleetSnapshot {
        FleetSnapshot {
            devices: self.devices.list(),
            control_log: self.control_log.list(),
            readings: self.readings.all(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{DeviceState, FirmwareDialect, Intent, NewDevice, TriggerSource};
    use pretty_assertions::assert_eq;

    fn device(name: &str, host: &str, group: PriorityGroup) -> Device {
        NewDevice {
            name: name.into(),
            model: None,
            host: host.into(),
            control_port: 4028,
            mgmt_port: 80,
            dialect: FirmwareDialect::Stock,
            credentials: None,
            group,
        }
        .into_device()
    }

    #[test]
    fn insert_rejects_duplicate_endpoint() {
        let store = MemoryDeviceStore::new();
        store
            .insert(device("a", "10.0.1.1", PriorityGroup::Low))
            .unwrap();

        let err = store
            .insert(device("b", "10.0.1.1", PriorityGroup::Low))
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateEndpoint { .. }));
    }

    #[test]
    fn update_rejects_endpoint_collision_but_allows_self() {
        let store = MemoryDeviceStore::new();
        let a = device("a", "10.0.1.1", PriorityGroup::Low);
        let mut b = device("b", "10.0.1.2", PriorityGroup::Low);
        store.insert(a.clone()).unwrap();
        store.insert(b.clone()).unwrap();

        // Re-writing a device at its own endpoint is fine.
        store.update(a.clone()).unwrap();

        b.host = a.host.clone();
        let err = store.update(b).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateEndpoint { .. }));
    }

    #[test]
    fn update_unknown_id_fails() {
        let store = MemoryDeviceStore::new();
        let err = store
            .update(device("ghost", "10.0.1.9", PriorityGroup::Low))
            .unwrap_err();
        assert!(matches!(err, CoreError::DeviceNotFound { .. }));
    }

    #[test]
    fn mining_in_groups_filters_state_and_group() {
        let store = MemoryDeviceStore::new();
        let mining_low = device("low", "10.0.1.1", PriorityGroup::Low);
        let mut sleeping_low = device("asleep", "10.0.1.2", PriorityGroup::Low);
        sleeping_low.state = DeviceState::Sleeping;
        let mining_critical = device("crit", "10.0.1.3", PriorityGroup::Critical);

        store.insert(mining_low.clone()).unwrap();
        store.insert(sleeping_low).unwrap();
        store.insert(mining_critical).unwrap();

        let matched = store.mining_in_groups(&[PriorityGroup::Low, PriorityGroup::Curtailable]);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, mining_low.id);
    }

    #[test]
    fn list_is_sorted_by_name() {
        let store = MemoryDeviceStore::new();
        store
            .insert(device("zeta", "10.0.1.1", PriorityGroup::Low))
            .unwrap();
        store
            .insert(device("alpha", "10.0.1.2", PriorityGroup::Low))
            .unwrap();

        let names: Vec<String> = store.list().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn control_log_finalize_closes_entry() {
        let store = MemoryControlLogStore::new();
        let entry = ControlLogEntry::open(
            vec![Uuid::new_v4()],
            Intent::Sleep,
            TriggerSource::Manual,
            "test",
        );
        let id = entry.id;
        store.append(entry);

        store.finalize(
            id,
            vec![DeviceResult {
                device_id: Uuid::new_v4(),
                success: true,
                degraded: false,
                message: "ok".into(),
            }],
        );

        let closed = store.get(id).unwrap();
        assert!(closed.status.is_terminal());
        assert!(closed.completed_at.is_some());
    }

    #[test]
    fn snapshot_round_trips_through_stores() {
        let stores = FleetStores::new();
        let d = device("a", "10.0.1.1", PriorityGroup::High);
        stores.devices.insert(d.clone()).unwrap();
        stores.control_log.append(ControlLogEntry::open(
            vec![d.id],
            Intent::Reboot,
            TriggerSource::Manual,
            "maintenance",
        ));

        let rehydrated = FleetStores::from_snapshot(stores.snapshot());
        assert_eq!(rehydrated.devices.list().len(), 1);
        assert_eq!(rehydrated.control_log.list().len(), 1);
        assert_eq!(rehydrated.devices.get(d.id).unwrap().name, "a");
    }
}
