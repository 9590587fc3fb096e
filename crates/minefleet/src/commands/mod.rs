//! Command handlers and shared dispatch plumbing.

pub mod config_cmd;
pub mod devices;
pub mod fleet;
pub mod log_cmd;
pub mod stats;
pub mod util;

use minefleet_core::{BatchReport, ExecutionStatus, FleetOrchestrator, FleetStores, SnapshotFile};

use crate::cli::{Command, GlobalOpts};
use crate::error::{CliError, exit_code};

/// Everything a fleet-touching command needs: the orchestrator, the
/// backing stores, and the snapshot file to persist them to afterwards.
pub struct FleetContext {
    pub orchestrator: FleetOrchestrator,
    pub stores: FleetStores,
    pub snapshot_file: SnapshotFile,
}

impl FleetContext {
    /// Write the stores back to disk after a command ran.
    pub fn persist(&self) -> Result<(), CliError> {
        self.snapshot_file.save(&self.stores.snapshot())?;
        Ok(())
    }
}

/// Route a parsed command to its handler, returning the process exit
/// code. `config` and `completions` are handled before a context is
/// built and never reach this function.
pub async fn dispatch(
    command: Command,
    ctx: &FleetContext,
    global: &GlobalOpts,
) -> Result<i32, CliError> {
    match command {
        Command::Devices(args) => {
            devices::handle(ctx, args, global).map(|()| exit_code::SUCCESS)
        }
        Command::Fleet(args) => fleet::handle(ctx, args, global).await,
        Command::Stats => {
            stats::handle(ctx, global);
            Ok(exit_code::SUCCESS)
        }
        Command::Log(args) => log_cmd::handle(ctx, args, global).map(|()| exit_code::SUCCESS),
        // Handled in main before a context exists.
        Command::Config(_) | Command::Completions(_) => Ok(exit_code::SUCCESS),
    }
}

/// Exit code for a finished batch: partial and failed batches succeed
/// as commands but signal the outcome through the exit status.
pub(crate) fn batch_exit_code(report: &BatchReport) -> i32 {
    match report.status {
        ExecutionStatus::Success => exit_code::SUCCESS,
        ExecutionStatus::Partial => exit_code::PARTIAL,
        ExecutionStatus::Failed => exit_code::FAILED,
        ExecutionStatus::InProgress => exit_code::GENERAL,
    }
}
