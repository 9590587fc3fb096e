//! Audit log inspection handlers.

use tabled::Tabled;
use uuid::Uuid;

use minefleet_core::{ControlLogEntry, ControlLogStore};

use crate::cli::{GlobalOpts, LogArgs, LogCommand};
use crate::error::CliError;
use crate::output;

use super::{FleetContext, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct LogRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Intent")]
    intent: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Targets")]
    targets: usize,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl From<&ControlLogEntry> for LogRow {
    fn from(e: &ControlLogEntry) -> Self {
        Self {
            time: e.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            id: e.id.to_string(),
            intent: e.intent.to_string(),
            source: e.source.to_string(),
            status: e.status.to_string(),
            targets: e.targets.len(),
            reason: e.reason.clone(),
        }
    }
}

fn detail(ctx: &FleetContext, e: &ControlLogEntry) -> String {
    let mut lines = vec![
        format!("ID:        {}", e.id),
        format!("Intent:    {}", e.intent),
        format!("Source:    {}", e.source),
        format!("Status:    {}", e.status),
        format!("Reason:    {}", e.reason),
        format!("Created:   {}", e.created_at.format("%Y-%m-%d %H:%M:%S")),
        format!(
            "Completed: {}",
            util::dash(e.completed_at.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()))
        ),
        format!("Targets:   {}", e.targets.len()),
    ];
    if !e.results.is_empty() {
        lines.push(String::new());
        lines.push("Results:".to_owned());
        for r in &e.results {
            let name = ctx
                .orchestrator
                .get(r.device_id)
                .map_or_else(|_| r.device_id.to_string(), |d| d.name);
            let verdict = if r.success { "ok" } else { "failed" };
            let degraded = if r.degraded { " (degraded)" } else { "" };
            lines.push(format!("  {name}: {verdict}{degraded} -- {}", r.message));
        }
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(ctx: &FleetContext, args: LogArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        LogCommand::List { limit } => {
            let entries: Vec<ControlLogEntry> = ctx
                .stores
                .control_log
                .list()
                .into_iter()
                .take(limit)
                .collect();
            let out = output::render_list(
                &global.output,
                &entries,
                |e| LogRow::from(e),
                |e| e.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LogCommand::Show { entry } => {
            let id: Uuid = entry.parse().map_err(|_| CliError::LogEntryNotFound {
                identifier: entry.clone(),
            })?;
            let found =
                ctx.stores
                    .control_log
                    .get(id)
                    .ok_or(CliError::LogEntryNotFound { identifier: entry })?;
            let out = output::render_single(
                &global.output,
                &found,
                |e| detail(ctx, e),
                |e| e.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
