//! Fleet-wide stats handler.

use minefleet_core::FleetStats;

use crate::cli::GlobalOpts;
use crate::output;

use super::FleetContext;

pub fn handle(ctx: &FleetContext, global: &GlobalOpts) {
    let stats = ctx.orchestrator.stats();
    let out = output::render_single(&global.output, &stats, detail, |s| s.devices.to_string());
    output::print_output(&out, global.quiet);
}

fn detail(stats: &FleetStats) -> String {
    let mut lines = vec![
        format!("Devices:   {}", stats.devices),
        format!("Hashrate:  {:.2} TH/s", stats.hashrate_ths),
        format!("Power:     {:.2} kW", stats.power_kw),
        String::new(),
        "By state:".to_owned(),
    ];
    for (state, count) in &stats.by_state {
        lines.push(format!("  {state:<12} {count}"));
    }
    lines.push(String::new());
    lines.push("By group:".to_owned());
    for (group, count) in &stats.by_group {
        lines.push(format!("  {group:<12} {count}"));
    }
    lines.join("\n")
}
