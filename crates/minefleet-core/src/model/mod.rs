//! Canonical domain types: devices, the control log, and telemetry
//! samples.

pub mod control_log;
pub mod device;
pub mod reading;

pub use control_log::{ControlLogEntry, DeviceResult, ExecutionStatus, Intent, TriggerSource};
pub use device::{
    DEFAULT_MGMT_PORT, Device, DeviceState, DeviceUpdate, FirmwareDialect, NewDevice,
    PriorityGroup, Telemetry,
};
pub use reading::PowerReading;
