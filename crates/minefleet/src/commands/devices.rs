//! Device registry command handlers.

use secrecy::SecretString;
use tabled::Tabled;

use minefleet_core::{Device, DeviceUpdate, NewDevice};
use minefleet_proto::HttpCredentials;

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts, RegisterArgs, UpdateArgs};
use crate::error::CliError;
use crate::output;

use super::{FleetContext, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Dialect")]
    dialect: String,
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "GH/s")]
    hashrate: String,
    #[tabled(rename = "Power W")]
    power: String,
    #[tabled(rename = "Last seen")]
    last_seen: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        Self {
            name: d.name.clone(),
            id: d.id.to_string(),
            dialect: d.dialect.to_string(),
            group: d.group.to_string(),
            state: d.state.to_string(),
            hashrate: util::dash_f64(d.telemetry.hashrate_ghs),
            power: util::dash_f64(d.telemetry.power_w),
            last_seen: util::dash(d.last_seen.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())),
        }
    }
}

fn detail(d: &Device) -> String {
    let telemetry = &d.telemetry;
    let mut lines = vec![
        format!("ID:         {}", d.id),
        format!("Name:       {}", d.name),
        format!("Model:      {}", d.model.as_deref().unwrap_or("-")),
        format!("Endpoint:   {}", d.endpoint()),
        format!("Mgmt port:  {}", d.mgmt_port),
        format!("Dialect:    {}", d.dialect),
        format!("Group:      {}", d.group),
        format!("State:      {}", d.state),
        format!("Hashrate:   {} GH/s", util::dash_f64(telemetry.hashrate_ghs)),
        format!("Power:      {} W", util::dash_f64(telemetry.power_w)),
        format!(
            "Temps:      {} / {} / {} °C (in/out/chip)",
            util::dash_f64(telemetry.temp_inlet_c),
            util::dash_f64(telemetry.temp_outlet_c),
            util::dash_f64(telemetry.temp_chip_c),
        ),
        format!("Fan:        {} rpm", util::dash(telemetry.fan_rpm)),
        format!("Registered: {}", d.registered_at.format("%Y-%m-%d %H:%M:%S")),
    ];
    if let Some(seen) = d.last_seen {
        lines.push(format!("Last seen:  {}", seen.format("%Y-%m-%d %H:%M:%S")));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(ctx: &FleetContext, args: DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List => {
            let devices = ctx.orchestrator.list();
            let out = output::render_list(
                &global.output,
                &devices,
                |d| DeviceRow::from(d),
                |d| d.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Get { device } => {
            let found = util::resolve_device(&ctx.orchestrator, &device)?;
            let out = output::render_single(&global.output, &found, detail, |d| d.id.to_string());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Register(args) => {
            let device = ctx.orchestrator.register(new_device(args)?)?;
            output::print_output(
                &format!("registered '{}' ({})", device.name, device.id),
                global.quiet,
            );
            Ok(())
        }

        DevicesCommand::Update(args) => {
            let target = util::resolve_device(&ctx.orchestrator, &args.device)?;
            let updated = ctx.orchestrator.update(target.id, device_update(args))?;
            output::print_output(&format!("updated '{}'", updated.name), global.quiet);
            Ok(())
        }

        DevicesCommand::Delete { device } => {
            let target = util::resolve_device(&ctx.orchestrator, &device)?;
            if !util::confirm(&format!("delete device '{}'", target.name), global.yes)? {
                return Ok(());
            }
            let removed = ctx.orchestrator.delete(target.id)?;
            output::print_output(&format!("deleted '{}'", removed.name), global.quiet);
            Ok(())
        }
    }
}

fn new_device(args: RegisterArgs) -> Result<NewDevice, CliError> {
    Ok(NewDevice {
        name: args.name,
        model: args.model,
        host: args.host,
        control_port: args.port,
        mgmt_port: args.mgmt_port,
        dialect: args.dialect,
        credentials: credentials(args.username, args.password)?,
        group: args.group,
    })
}

fn credentials(
    username: Option<String>,
    password: Option<String>,
) -> Result<Option<HttpCredentials>, CliError> {
    match (username, password) {
        (Some(username), Some(password)) => Ok(Some(HttpCredentials {
            username,
            password: SecretString::from(password),
        })),
        (None, None) => Ok(None),
        _ => Err(CliError::Validation {
            field: "credentials".into(),
            reason: "--username and --password must be given together".into(),
        }),
    }
}

fn device_update(args: UpdateArgs) -> DeviceUpdate {
    DeviceUpdate {
        name: args.name,
        model: args.model,
        host: args.host,
        control_port: args.port,
        mgmt_port: args.mgmt_port,
        dialect: args.dialect,
        credentials: None,
        group: args.group,
    }
}
