//! Shared helpers for command handlers.

use std::io::{self, IsTerminal};

use uuid::Uuid;

use minefleet_core::{Device, FleetOrchestrator};

use crate::error::CliError;

/// Resolve a device selector (id or name) against the registry.
pub fn resolve_device(
    orchestrator: &FleetOrchestrator,
    selector: &str,
) -> Result<Device, CliError> {
    orchestrator
        .list()
        .into_iter()
        .find(|d| d.name == selector || d.id.to_string() == selector)
        .ok_or_else(|| CliError::DeviceNotFound {
            identifier: selector.to_owned(),
        })
}

/// Resolve a list of selectors to target ids. An empty list means the
/// whole fleet.
pub fn resolve_targets(
    orchestrator: &FleetOrchestrator,
    selectors: &[String],
) -> Result<Vec<Uuid>, CliError> {
    if selectors.is_empty() {
        return Ok(orchestrator.list().into_iter().map(|d| d.id).collect());
    }
    selectors
        .iter()
        .map(|s| resolve_device(orchestrator, s).map(|d| d.id))
        .collect()
}

/// Confirm a destructive action. `--yes` skips the prompt; running
/// non-interactively without it is an error rather than a hang.
pub fn confirm(action: &str, yes: bool) -> Result<bool, CliError> {
    if yes {
        return Ok(true);
    }
    if !io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.to_owned(),
        });
    }

    let confirmed = dialoguer::Confirm::new()
        .with_prompt(format!("{action}?"))
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(io::Error::other(e)))?;
    Ok(confirmed)
}

/// `-` placeholder for absent optional values in table output.
pub fn dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".into(), |v| v.to_string())
}

/// Format an optional float with one decimal, `-` when absent.
pub fn dash_f64(value: Option<f64>) -> String {
    value.map_or_else(|| "-".into(), |v| format!("{v:.1}"))
}
