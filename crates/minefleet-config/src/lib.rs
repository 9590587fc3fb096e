//! Shared configuration for the minefleet CLI.
//!
//! TOML profiles merged with environment overrides, plus resolution of
//! the operational settings the orchestrator needs: where the fleet
//! data file lives, the control-channel read timeout, and the wake
//! stagger interval.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no profile named '{profile}' in the config file")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults, overridable per profile.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named fleet profiles (e.g. one per site).
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Control-channel read timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Delay between consecutive wake attempts in seconds.
    #[serde(default = "default_wake_stagger")]
    pub wake_stagger: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            wake_stagger: default_wake_stagger(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_wake_stagger() -> u64 {
    5
}

/// A named fleet profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Fleet data file (device registry, control log, readings).
    /// Defaults to the platform data directory.
    pub data_file: Option<PathBuf>,

    /// Override the control-channel read timeout.
    pub timeout: Option<u64>,

    /// Override the wake stagger interval.
    pub wake_stagger: Option<u64>,
}

// ── Resolved settings ───────────────────────────────────────────────

/// Everything the CLI needs after profile resolution.
#[derive(Debug, Clone)]
pub struct FleetSettings {
    pub profile: String,
    pub data_file: PathBuf,
    pub read_timeout: Duration,
    pub wake_stagger: Duration,
}

/// Resolve a profile into operational settings. An explicitly named
/// profile must exist; the implicit default may be absent, in which
/// case the global defaults apply unchanged.
pub fn resolve(config: &Config, name: Option<&str>) -> Result<FleetSettings, ConfigError> {
    let profile_name = name
        .map(ToOwned::to_owned)
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into());

    let profile = match config.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if name.is_some() => {
            return Err(ConfigError::UnknownProfile {
                profile: profile_name,
            });
        }
        None => Profile::default(),
    };

    let timeout = profile.timeout.unwrap_or(config.defaults.timeout);
    if timeout == 0 {
        return Err(ConfigError::Validation {
            field: "timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    Ok(FleetSettings {
        data_file: profile
            .data_file
            .unwrap_or_else(|| default_data_file(&profile_name)),
        read_timeout: Duration::from_secs(timeout),
        wake_stagger: Duration::from_secs(
            profile.wake_stagger.unwrap_or(config.defaults.wake_stagger),
        ),
        profile: profile_name,
    })
}

// ── Paths ───────────────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "minefleet", "minefleet").map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn default_data_file(profile: &str) -> PathBuf {
    let file = format!("{profile}.json");
    ProjectDirs::from("io", "minefleet", "minefleet").map_or_else(
        || dirs_fallback().join(&file),
        |dirs| dirs.data_dir().join(&file),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("minefleet");
    p
}

// ── Config loading / saving ─────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(config_path()))
        .merge(Env::prefixed("MINEFLEET_").split("_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

/// Serialize config to TOML and write it to the canonical path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(())
}
