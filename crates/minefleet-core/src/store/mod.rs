//! Storage seams for the three fleet collections.
//!
//! The orchestrator consumes these as generic keyed stores with
//! filter-by-field queries and assumes nothing about the storage
//! engine. [`memory`] provides the concurrent in-process
//! implementation; [`persist`] snapshots it to a JSON file between
//! invocations.

pub mod memory;
pub mod persist;

use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{ControlLogEntry, Device, DeviceResult, PowerReading, PriorityGroup};

pub use memory::{FleetStores, MemoryControlLogStore, MemoryDeviceStore, MemoryReadingStore};
pub use persist::{FleetSnapshot, SnapshotFile};

/// Durable store of device records.
pub trait DeviceStore: Send + Sync {
    /// All devices, ordered by name for stable presentation.
    fn list(&self) -> Vec<Device>;

    fn get(&self, id: Uuid) -> Option<Device>;

    /// Insert a new record. Fails if another active device already
    /// occupies the same host + control-port endpoint.
    fn insert(&self, device: Device) -> Result<(), CoreError>;

    /// Replace an existing record. Fails if the id is unknown or the
    /// edited endpoint collides with another device.
    fn update(&self, device: Device) -> Result<(), CoreError>;

    /// Remove a record, returning it if it existed. Control log entries
    /// referencing the device are retained for audit.
    fn remove(&self, id: Uuid) -> Option<Device>;

    /// Devices currently `mining` whose priority group is in `groups`.
    fn mining_in_groups(&self, groups: &[PriorityGroup]) -> Vec<Device>;
}

/// Append-only audit trail of command invocations.
pub trait ControlLogStore: Send + Sync {
    fn append(&self, entry: ControlLogEntry);

    /// Finalize an open entry exactly once: record per-device results,
    /// derive the terminal status, and stamp `completed_at`.
    fn finalize(&self, id: Uuid, results: Vec<DeviceResult>);

    fn get(&self, id: Uuid) -> Option<ControlLogEntry>;

    /// All entries, newest first.
    fn list(&self) -> Vec<ControlLogEntry>;
}

/// Append-only telemetry time series.
pub trait ReadingStore: Send + Sync {
    fn append(&self, reading: PowerReading);

    /// Samples for one device, oldest first.
    fn for_device(&self, device_id: Uuid) -> Vec<PowerReading>;
}
