// ── Wire-to-domain conversion ──
//
// Maps the typed protocol payloads onto the canonical telemetry shape.
// The summary is authoritative for hashrate; power may come from either
// payload depending on firmware.

use minefleet_proto::{StatsResponse, SummaryResponse};

use crate::model::Telemetry;

/// Merge a `stats` + `summary` pair into last-observed telemetry.
pub fn telemetry(stats: &StatsResponse, summary: &SummaryResponse) -> Telemetry {
    let stat = stats.stats.first();
    let sum = summary.summary.first();

    Telemetry {
        hashrate_ghs: sum.map(|s| s.ghs_5s),
        power_w: stat
            .and_then(|s| s.power_w)
            .or_else(|| sum.and_then(|s| s.power_w)),
        temp_inlet_c: stat.and_then(|s| s.temp_inlet_c),
        temp_outlet_c: stat.and_then(|s| s.temp_outlet_c),
        temp_chip_c: stat.and_then(|s| s.temp_chip_c),
        fan_rpm: stat.and_then(minefleet_proto::StatsEntry::fan_rpm),
    }
}
