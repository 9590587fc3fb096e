// ── Fleet-wide stats projection ──
//
// Pure read over a registry snapshot. No caching; recomputed per call.

use std::collections::BTreeMap;

use serde::Serialize;
use strum::IntoEnumIterator;

use crate::model::{Device, DeviceState, PriorityGroup};

/// Counts and totals across the whole fleet. Hashrate and power sum
/// only over devices currently `mining` -- stale telemetry from a
/// sleeping device would misreport the live draw.
#[derive(Debug, Clone, Serialize)]
pub struct FleetStats {
    pub devices: usize,
    pub by_state: BTreeMap<DeviceState, usize>,
    pub by_group: BTreeMap<PriorityGroup, usize>,
    pub hashrate_ths: f64,
    pub power_kw: f64,
}

pub fn aggregate(devices: &[Device]) -> FleetStats {
    // Seed every bucket so consumers see explicit zeroes.
    let mut by_state: BTreeMap<DeviceState, usize> =
        DeviceState::iter().map(|s| (s, 0)).collect();
    let mut by_group: BTreeMap<PriorityGroup, usize> =
        PriorityGroup::iter().map(|g| (g, 0)).collect();

    let mut hashrate_ghs = 0.0;
    let mut power_w = 0.0;
    for device in devices {
        *by_state.entry(device.state).or_default() += 1;
        *by_group.entry(device.group).or_default() += 1;

        if device.state.is_mining() {
            hashrate_ghs += device.telemetry.hashrate_ghs.unwrap_or_default();
            power_w += device.telemetry.power_w.unwrap_or_default();
        }
    }

    FleetStats {
        devices: devices.len(),
        by_state,
        by_group,
        hashrate_ths: hashrate_ghs / 1000.0,
        power_kw: power_w / 1000.0,
    }
}
