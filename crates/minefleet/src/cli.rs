//! Clap derive structures for the `minefleet` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use minefleet_core::{FirmwareDialect, PriorityGroup};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// minefleet -- fleet control for network-attached ASIC miners
#[derive(Debug, Parser)]
#[command(
    name = "minefleet",
    version,
    about = "Operate a fleet of ASIC mining devices from the command line",
    long_about = "Fleet control for network-attached ASIC mining hardware.\n\n\
        Talks the framed TCP control protocol across four firmware dialects\n\
        (stock, luxos, vnish, braiins), records every command in an audit\n\
        log, and applies safe concurrency: parallel polls and sleeps,\n\
        staggered wake-ups to bound inrush current.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Fleet profile to use
    #[arg(long, short = 'p', env = "MINEFLEET_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Fleet data file (overrides profile)
    #[arg(long, env = "MINEFLEET_DATA_FILE", global = true)]
    pub data_file: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "MINEFLEET_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Control-channel read timeout in seconds (overrides profile)
    #[arg(long, env = "MINEFLEET_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage the device registry
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Issue batch commands to the fleet
    #[command(alias = "f")]
    Fleet(FleetArgs),

    /// Fleet-wide counts, hashrate, and power
    Stats,

    /// Inspect the control audit log
    Log(LogArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List registered devices
    #[command(alias = "ls")]
    List,

    /// Show one device in detail
    Get {
        /// Device id or name
        device: String,
    },

    /// Register a new device
    #[command(alias = "add")]
    Register(RegisterArgs),

    /// Edit a registered device
    Update(UpdateArgs),

    /// Remove a device from the registry
    #[command(alias = "rm")]
    Delete {
        /// Device id or name
        device: String,
    },
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    /// Human-readable device name
    pub name: String,

    /// Device address (host or IP)
    #[arg(long)]
    pub host: String,

    /// Control protocol port
    #[arg(long, default_value = "4028")]
    pub port: u16,

    /// HTTP management port
    #[arg(long, default_value = "80")]
    pub mgmt_port: u16,

    /// Firmware dialect
    #[arg(long, value_parser = parse_dialect)]
    pub dialect: FirmwareDialect,

    /// Curtailment priority group
    #[arg(long, value_parser = parse_group, default_value = "medium")]
    pub group: PriorityGroup,

    /// Hardware model string
    #[arg(long)]
    pub model: Option<String>,

    /// Username for the HTTP management interface
    #[arg(long)]
    pub username: Option<String>,

    /// Password for the HTTP management interface
    #[arg(long, hide_env = true, env = "MINEFLEET_DEVICE_PASSWORD")]
    pub password: Option<String>,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Device id or name
    pub device: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub mgmt_port: Option<u16>,

    #[arg(long, value_parser = parse_dialect)]
    pub dialect: Option<FirmwareDialect>,

    #[arg(long, value_parser = parse_group)]
    pub group: Option<PriorityGroup>,

    #[arg(long)]
    pub model: Option<String>,
}

// ── fleet ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct FleetArgs {
    #[command(subcommand)]
    pub command: FleetCommand,
}

#[derive(Debug, Subcommand)]
pub enum FleetCommand {
    /// Poll devices and refresh telemetry
    Status {
        /// Device ids or names (default: the whole fleet)
        devices: Vec<String>,
    },

    /// Put devices into low power (parallel)
    Sleep {
        /// Device ids or names
        #[arg(required = true)]
        devices: Vec<String>,

        /// Audit reason
        #[arg(long, default_value = "operator request")]
        reason: String,
    },

    /// Wake devices sequentially with a stagger delay
    Wakeup {
        /// Device ids or names
        #[arg(required = true)]
        devices: Vec<String>,

        /// Audit reason
        #[arg(long, default_value = "operator request")]
        reason: String,

        /// Seconds between consecutive wake attempts
        #[arg(long)]
        stagger: Option<u64>,
    },

    /// Reboot devices (management channel preferred)
    Reboot {
        /// Device ids or names
        #[arg(required = true)]
        devices: Vec<String>,

        /// Audit reason
        #[arg(long, default_value = "operator request")]
        reason: String,
    },

    /// Sleep every mining device in the given priority groups
    BatchSleep {
        /// Priority groups to curtail
        #[arg(long = "group", required = true, value_parser = parse_group)]
        groups: Vec<PriorityGroup>,

        /// Audit reason
        #[arg(long, default_value = "demand response")]
        reason: String,
    },
}

// ── log ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LogArgs {
    #[command(subcommand)]
    pub command: LogCommand,
}

#[derive(Debug, Subcommand)]
pub enum LogCommand {
    /// List audit entries, newest first
    #[command(alias = "ls")]
    List {
        /// Max entries to show
        #[arg(long, short = 'l', default_value = "25")]
        limit: usize,
    },

    /// Show one entry with per-device results
    Show {
        /// Entry id
        entry: String,
    },
}

// ── config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create a starter config file
    Init,

    /// Print the effective configuration
    Show,

    /// Set a profile value (data_file, timeout, wake_stagger)
    Set {
        /// Setting name
        key: String,

        /// Value to set
        value: String,
    },

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

// ── completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

// ── Value parsers ────────────────────────────────────────────────────

fn parse_dialect(s: &str) -> Result<FirmwareDialect, String> {
    s.parse()
        .map_err(|_| format!("unknown dialect '{s}' (expected stock, luxos, vnish, or braiins)"))
}

fn parse_group(s: &str) -> Result<PriorityGroup, String> {
    s.parse().map_err(|_| {
        format!("unknown group '{s}' (expected critical, high, medium, low, or curtailable)")
    })
}
