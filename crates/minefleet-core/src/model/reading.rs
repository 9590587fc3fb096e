// ── Power reading domain type ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::device::Telemetry;

/// Append-only telemetry sample, written once per successful status
/// poll. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerReading {
    pub device_id: Uuid,
    pub hashrate_ghs: Option<f64>,
    pub power_w: Option<f64>,
    pub temp_inlet_c: Option<f64>,
    pub temp_outlet_c: Option<f64>,
    pub temp_chip_c: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

impl PowerReading {
    /// Snapshot the telemetry just observed for a device.
    pub fn sample(device_id: Uuid, telemetry: &Telemetry, recorded_at: DateTime<Utc>) -> Self {
        Self {
            device_id,
            hashrate_ghs: telemetry.hashrate_ghs,
            power_w: telemetry.power_w,
            temp_inlet_c: telemetry.temp_inlet_c,
            temp_outlet_c: telemetry.temp_outlet_c,
            temp_chip_c: telemetry.temp_chip_c,
            recorded_at,
        }
    }
}
