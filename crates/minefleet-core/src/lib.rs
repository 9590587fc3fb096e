//! Fleet control for network-attached ASIC mining hardware.
//!
//! This crate owns the business logic of the workspace:
//!
//! - **[`FleetOrchestrator`]** — The subsystem facade. Registry CRUD,
//!   batch command execution (status / sleep / wakeup / reboot /
//!   batch-sleep), and the fleet-wide stats projection. Applies the
//!   per-intent concurrency policy: unordered parallel fan-out for
//!   reads and sleep, staggered-sequential execution for wake-up to
//!   bound inrush current.
//!
//! - **[`Dispatcher`]** — Maps abstract intents onto the concrete
//!   command sequence for each of the four supported firmware
//!   dialects, folding every expected device-level failure into a
//!   structured [`DispatchOutcome`].
//!
//! - **Domain model** ([`model`]) — Canonical types ([`Device`],
//!   [`ControlLogEntry`], [`PowerReading`]) shared by the stores, the
//!   orchestrator, and CLI consumers.
//!
//! - **Stores** ([`store`]) — The three fleet collections behind
//!   storage-agnostic traits, with concurrent in-memory
//!   implementations and a JSON snapshot for persistence between
//!   invocations.

pub mod convert;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod stats;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use dispatch::{DispatchOutcome, Dispatcher, FailureClass};
pub use error::CoreError;
pub use orchestrator::{BatchReport, DEFAULT_WAKE_STAGGER, FleetOrchestrator};
pub use stats::FleetStats;
pub use store::{
    ControlLogStore, DeviceStore, FleetSnapshot, FleetStores, ReadingStore, SnapshotFile,
};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    ControlLogEntry,
    Device,
    DeviceResult,
    DeviceState,
    DeviceUpdate,
    ExecutionStatus,
    FirmwareDialect,
    Intent,
    NewDevice,
    PowerReading,
    PriorityGroup,
    Telemetry,
    TriggerSource,
};
