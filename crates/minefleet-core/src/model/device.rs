// ── Device domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

use minefleet_proto::HttpCredentials;

/// Default port for the HTTP management interface.
pub const DEFAULT_MGMT_PORT: u16 = 80;

/// Firmware dialect a managed device runs.
///
/// The four dialects expose mutually incompatible control surfaces; the
/// dispatcher selects the concrete command sequence from this tag.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FirmwareDialect {
    /// Vendor firmware. No low-power primitive at all.
    Stock,
    /// LuxOS. Native `curtail` low-power primitive behind a logon session.
    Luxos,
    /// Vnish. Low power via pinning the core frequency to zero.
    Vnish,
    /// Braiins OS. Graceful software exit of the mining process.
    Braiins,
}

/// Curtailment priority. Decides batch-sleep eligibility and shutdown
/// ordering under demand-response signals.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PriorityGroup {
    Critical,
    High,
    Medium,
    Low,
    Curtailable,
}

/// Device operational state. No state is terminal; devices cycle
/// indefinitely between these.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceState {
    Mining,
    Sleeping,
    Rebooting,
    Offline,
    Error,
}

impl DeviceState {
    pub fn is_mining(self) -> bool {
        matches!(self, Self::Mining)
    }

    /// States from which a successful poll confirms the device is back
    /// to normal operation.
    pub fn is_recoverable(self) -> bool {
        matches!(self, Self::Rebooting | Self::Offline | Self::Error)
    }
}

/// Last-observed telemetry for one device. Every field is optional:
/// firmwares report different subsets, and nothing is known before the
/// first successful poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub hashrate_ghs: Option<f64>,
    pub power_w: Option<f64>,
    pub temp_inlet_c: Option<f64>,
    pub temp_outlet_c: Option<f64>,
    pub temp_chip_c: Option<f64>,
    pub fan_rpm: Option<u32>,
}

/// One managed hardware unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub host: String,
    pub control_port: u16,
    #[serde(default = "default_mgmt_port")]
    pub mgmt_port: u16,
    pub dialect: FirmwareDialect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<HttpCredentials>,
    pub group: PriorityGroup,
    pub state: DeviceState,
    #[serde(default)]
    pub telemetry: Telemetry,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
    pub registered_at: DateTime<Utc>,
}

fn default_mgmt_port() -> u16 {
    DEFAULT_MGMT_PORT
}

impl Device {
    /// Control-channel endpoint, unique across active devices.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.control_port)
    }
}

/// Registration payload for a new device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDevice {
    pub name: String,
    #[serde(default)]
    pub model: Option<String>,
    pub host: String,
    pub control_port: u16,
    #[serde(default = "default_mgmt_port")]
    pub mgmt_port: u16,
    pub dialect: FirmwareDialect,
    #[serde(default)]
    pub credentials: Option<HttpCredentials>,
    pub group: PriorityGroup,
}

impl NewDevice {
    /// Materialize a registry record. New devices start in `mining`,
    /// with empty telemetry and no last-seen timestamp.
    pub fn into_device(self) -> Device {
        Device {
            id: Uuid::new_v4(),
            name: self.name,
            model: self.model,
            host: self.host,
            control_port: self.control_port,
            mgmt_port: self.mgmt_port,
            dialect: self.dialect,
            credentials: self.credentials,
            group: self.group,
            state: DeviceState::Mining,
            telemetry: Telemetry::default(),
            last_seen: None,
            registered_at: Utc::now(),
        }
    }
}

/// Partial operator edit of a device record. `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceUpdate {
    pub name: Option<String>,
    pub model: Option<String>,
    pub host: Option<String>,
    pub control_port: Option<u16>,
    pub mgmt_port: Option<u16>,
    pub dialect: Option<FirmwareDialect>,
    pub credentials: Option<HttpCredentials>,
    pub group: Option<PriorityGroup>,
}

impl DeviceUpdate {
    pub fn apply(self, device: &mut Device) {
        if let Some(name) = self.name {
            device.name = name;
        }
        if let Some(model) = self.model {
            device.model = Some(model);
        }
        if let Some(host) = self.host {
            device.host = host;
        }
        if let Some(port) = self.control_port {
            device.control_port = port;
        }
        if let Some(port) = self.mgmt_port {
            device.mgmt_port = port;
        }
        if let Some(dialect) = self.dialect {
            device.dialect = dialect;
        }
        if let Some(credentials) = self.credentials {
            device.credentials = Some(credentials);
        }
        if let Some(group) = self.group {
            device.group = group;
        }
    }
}
