mod cli;
mod commands;
mod error;
mod output;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use minefleet_core::{
    ControlLogStore, DeviceStore, Dispatcher, FleetOrchestrator, FleetStores, ReadingStore,
    SnapshotFile,
};
use minefleet_proto::{HttpManagementChannel, TcpControlChannel};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::commands::FleetContext;
use crate::error::{CliError, exit_code};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            std::process::exit(code);
        }
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<i32, CliError> {
    match cli.command {
        // Config commands run without opening the fleet data file.
        Command::Config(args) => {
            commands::config_cmd::handle(args.command, &cli.global)?;
            Ok(exit_code::SUCCESS)
        }

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "minefleet", &mut std::io::stdout());
            Ok(exit_code::SUCCESS)
        }

        cmd => {
            let ctx = build_context(&cli.global)?;

            tracing::debug!(command = ?cmd, "dispatching command");
            let code = commands::dispatch(cmd, &ctx, &cli.global).await?;
            ctx.persist()?;
            Ok(code)
        }
    }
}

/// Assemble the fleet context from the config file, the active profile,
/// and CLI flag overrides.
fn build_context(global: &GlobalOpts) -> Result<FleetContext, CliError> {
    let config = minefleet_config::load_config_or_default();
    let mut settings = minefleet_config::resolve(&config, global.profile.as_deref())?;

    if let Some(path) = &global.data_file {
        settings.data_file = path.clone();
    }
    if let Some(seconds) = global.timeout {
        if seconds == 0 {
            return Err(CliError::Validation {
                field: "timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        settings.read_timeout = std::time::Duration::from_secs(seconds);
    }

    let snapshot_file = SnapshotFile::new(&settings.data_file);
    let stores = FleetStores::from_snapshot(snapshot_file.load()?);

    let control = Arc::new(TcpControlChannel::with_timeout(settings.read_timeout));
    let mgmt = Arc::new(HttpManagementChannel::new().map_err(CliError::HttpClient)?);
    let dispatcher = Dispatcher::new(control, mgmt);

    let orchestrator = FleetOrchestrator::new(
        Arc::clone(&stores.devices) as Arc<dyn DeviceStore>,
        Arc::clone(&stores.control_log) as Arc<dyn ControlLogStore>,
        Arc::clone(&stores.readings) as Arc<dyn ReadingStore>,
        dispatcher,
    )
    .with_wake_stagger(settings.wake_stagger);

    Ok(FleetContext {
        orchestrator,
        stores,
        snapshot_file,
    })
}
