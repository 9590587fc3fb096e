//! Configuration management handlers.
//!
//! These run before a fleet context exists: no data file is opened and
//! no network channel is built.

use minefleet_config::{Config, Profile, config_path, load_config, save_config};

use crate::cli::{ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub fn handle(command: ConfigCommand, global: &GlobalOpts) -> Result<(), CliError> {
    match command {
        ConfigCommand::Init => {
            let path = config_path();
            if path.exists() {
                output::print_output(
                    &format!("config already exists at {}", path.display()),
                    global.quiet,
                );
                return Ok(());
            }
            save_config(&Config::default())?;
            output::print_output(&format!("wrote {}", path.display()), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let config = load_config()?;
            let rendered = toml::to_string_pretty(&config)
                .map_err(minefleet_config::ConfigError::from)?;
            output::print_output(rendered.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut config = load_config()?;
            let profile_name = global
                .profile
                .clone()
                .or_else(|| config.default_profile.clone())
                .unwrap_or_else(|| "default".into());
            let profile = config
                .profiles
                .entry(profile_name.clone())
                .or_insert_with(Profile::default);

            match key.as_str() {
                "data_file" | "data-file" => profile.data_file = Some(value.into()),
                "timeout" => profile.timeout = Some(parse_seconds("timeout", &value)?),
                "wake_stagger" | "wake-stagger" => {
                    profile.wake_stagger = Some(parse_seconds("wake_stagger", &value)?);
                }
                other => {
                    return Err(CliError::Validation {
                        field: "key".into(),
                        reason: format!(
                            "unknown setting '{other}' (expected data_file, timeout, or wake_stagger)"
                        ),
                    });
                }
            }

            save_config(&config)?;
            output::print_output(
                &format!("set {key} for profile '{profile_name}'"),
                global.quiet,
            );
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let config = load_config()?;
            let default = config.default_profile.as_deref();
            let mut names: Vec<&String> = config.profiles.keys().collect();
            names.sort();

            let mut lines = Vec::with_capacity(names.len() + 1);
            // The implicit default profile exists even without a section.
            if let Some(default) = default
                && !config.profiles.contains_key(default)
            {
                lines.push(format!("{default} (default)"));
            }
            for name in names {
                if default == Some(name.as_str()) {
                    lines.push(format!("{name} (default)"));
                } else {
                    lines.push(name.clone());
                }
            }
            output::print_output(&lines.join("\n"), global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut config = load_config()?;
            if !config.profiles.contains_key(&name) && name != "default" {
                return Err(CliError::ProfileNotFound { profile: name });
            }
            config.default_profile = Some(name.clone());
            save_config(&config)?;
            output::print_output(&format!("default profile is now '{name}'"), global.quiet);
            Ok(())
        }
    }
}

fn parse_seconds(field: &'static str, value: &str) -> Result<u64, CliError> {
    let seconds: u64 = value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("'{value}' is not a number of seconds"),
    })?;
    if seconds == 0 {
        return Err(CliError::Validation {
            field: field.into(),
            reason: "must be at least 1 second".into(),
        });
    }
    Ok(seconds)
}
