//! Fleet batch command handlers.
//!
//! Each handler resolves targets, runs the batch through the
//! orchestrator, renders the per-device report, and maps the aggregate
//! status to an exit code.

use std::time::Duration;

use owo_colors::OwoColorize;
use tabled::Tabled;

use minefleet_core::{BatchReport, DeviceResult};

use crate::cli::{FleetArgs, FleetCommand, GlobalOpts, OutputFormat};
use crate::error::{CliError, exit_code};
use crate::output;

use super::{FleetContext, batch_exit_code, util};

pub async fn handle(
    ctx: &FleetContext,
    args: FleetArgs,
    global: &GlobalOpts,
) -> Result<i32, CliError> {
    let report = match args.command {
        FleetCommand::Status { devices } => {
            let ids = util::resolve_targets(&ctx.orchestrator, &devices)?;
            ctx.orchestrator.status(&ids).await?
        }

        FleetCommand::Sleep { devices, reason } => {
            let ids = util::resolve_targets(&ctx.orchestrator, &devices)?;
            if !util::confirm(&format!("sleep {} device(s)", ids.len()), global.yes)? {
                return Ok(exit_code::SUCCESS);
            }
            ctx.orchestrator.sleep(&ids, &reason).await?
        }

        FleetCommand::Wakeup {
            devices,
            reason,
            stagger,
        } => {
            let ids = util::resolve_targets(&ctx.orchestrator, &devices)?;
            let stagger = stagger.map(Duration::from_secs);
            ctx.orchestrator.wakeup(&ids, &reason, stagger).await?
        }

        FleetCommand::Reboot { devices, reason } => {
            let ids = util::resolve_targets(&ctx.orchestrator, &devices)?;
            if !util::confirm(&format!("reboot {} device(s)", ids.len()), global.yes)? {
                return Ok(exit_code::SUCCESS);
            }
            ctx.orchestrator.reboot(&ids, &reason).await?
        }

        FleetCommand::BatchSleep { groups, reason } => {
            if !util::confirm(
                &format!("sleep all mining devices in {} group(s)", groups.len()),
                global.yes,
            )? {
                return Ok(exit_code::SUCCESS);
            }
            ctx.orchestrator.batch_sleep(&groups, &reason).await?
        }
    };

    render_report(ctx, &report, global);
    Ok(batch_exit_code(&report))
}

// ── Report rendering ────────────────────────────────────────────────

#[derive(Tabled)]
struct BatchRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Message")]
    message: String,
}

fn render_report(ctx: &FleetContext, report: &BatchReport, global: &GlobalOpts) {
    match global.output {
        OutputFormat::Table => {
            let color = output::should_color(&global.color);
            let summary = format!(
                "{}: {} ({}/{} devices)",
                report.intent,
                report.status,
                report.affected(),
                report.results.len(),
            );
            output::print_output(&summary, global.quiet);
            if !report.results.is_empty() {
                let rows: Vec<BatchRow> = report
                    .results
                    .iter()
                    .map(|r| batch_row(ctx, r, color))
                    .collect();
                let table = tabled::Table::new(rows)
                    .with(tabled::settings::Style::rounded())
                    .to_string();
                output::print_output(&table, global.quiet);
            }
        }
        OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
            let out = output::render_single(&global.output, report, |_| String::new(), |_| {
                String::new()
            });
            output::print_output(&out, global.quiet);
        }
        OutputFormat::Plain => {
            let lines: Vec<String> = report
                .results
                .iter()
                .map(|r| {
                    format!(
                        "{} {}",
                        r.device_id,
                        if r.success { "ok" } else { "failed" }
                    )
                })
                .collect();
            output::print_output(&lines.join("\n"), global.quiet);
        }
    }
}

fn batch_row(ctx: &FleetContext, result: &DeviceResult, color: bool) -> BatchRow {
    // A device deleted mid-batch still shows up by id.
    let device = ctx
        .orchestrator
        .get(result.device_id)
        .map_or_else(|_| result.device_id.to_string(), |d| d.name);

    let verdict = match (result.success, color) {
        (true, true) => "OK".green().to_string(),
        (true, false) => "OK".to_owned(),
        (false, true) => "FAILED".red().to_string(),
        (false, false) => "FAILED".to_owned(),
    };

    let mut message = result.message.clone();
    if result.degraded {
        message.push_str(" (degraded)");
    }

    BatchRow {
        device,
        result: verdict,
        message,
    }
}
