// ── Firmware dispatch ──
//
// Translates abstract intents (sleep / wake / reboot / read-stats) into
// the literal command sequence for a device's firmware dialect. The
// four dialects expose genuinely different control primitives, so each
// gets its own `DialectOps` implementation, selected once per device
// from its stored dialect tag.
//
// Contract: dispatch never returns an error for expected device-level
// failure. Every protocol failure is folded into a structured
// `DispatchOutcome { success: false, .. }` so callers can aggregate
// per-device outcomes uniformly.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use minefleet_proto::response::{check_status, decode_pools, decode_stats, decode_summary};
use minefleet_proto::{CommandFrame, ControlChannel, Error as ProtoError, ManagementChannel};

use crate::convert;
use crate::model::{Device, FirmwareDialect, Telemetry};

// ── Outcome ─────────────────────────────────────────────────────────

/// How a failed attempt failed, for state-transition purposes: a
/// transport-class failure means the device never answered, a
/// protocol-class failure means it answered wrongly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Transport,
    Protocol,
}

/// Structured per-device result of one dispatched intent.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub success: bool,
    /// Succeeded with weaker semantics than requested (stock-firmware
    /// sleep is a process restart, not a low-power state).
    pub degraded: bool,
    pub message: String,
    /// Parsed telemetry, present only for a successful read-stats.
    pub telemetry: Option<Telemetry>,
    /// Failure classification, present only when `success` is false.
    pub failure: Option<FailureClass>,
}

impl DispatchOutcome {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            degraded: false,
            message: message.into(),
            telemetry: None,
            failure: None,
        }
    }

    fn ok_degraded(message: impl Into<String>) -> Self {
        Self {
            degraded: true,
            ..Self::ok(message)
        }
    }

    fn failed(message: impl Into<String>, failure: FailureClass) -> Self {
        Self {
            success: false,
            degraded: false,
            message: message.into(),
            telemetry: None,
            failure: Some(failure),
        }
    }

    fn from_proto_error(error: &ProtoError) -> Self {
        let class = match error {
            ProtoError::Transport { .. }
            | ProtoError::Timeout { .. }
            | ProtoError::EmptyResponse { .. }
            | ProtoError::Http { .. } => FailureClass::Transport,
            ProtoError::Decode { .. } | ProtoError::Rejected { .. } => FailureClass::Protocol,
        };
        Self::failed(error.to_string(), class)
    }
}

// ── Dispatcher ──────────────────────────────────────────────────────

/// Intent-to-command translation over injected channels.
#[derive(Clone)]
pub struct Dispatcher {
    control: Arc<dyn ControlChannel>,
    mgmt: Arc<dyn ManagementChannel>,
}

impl Dispatcher {
    pub fn new(control: Arc<dyn ControlChannel>, mgmt: Arc<dyn ManagementChannel>) -> Self {
        Self { control, mgmt }
    }

    pub async fn sleep(&self, device: &Device) -> DispatchOutcome {
        fold(ops(device.dialect).sleep(self.control.as_ref(), device).await)
    }

    pub async fn wake(&self, device: &Device) -> DispatchOutcome {
        fold(ops(device.dialect).wake(self.control.as_ref(), device).await)
    }

    /// Reboot is dialect-independent: the HTTP management endpoint is
    /// preferred, with the protocol-level restart as fallback.
    pub async fn reboot(&self, device: &Device) -> DispatchOutcome {
        let mgmt_err = match self
            .mgmt
            .reboot(&device.host, device.mgmt_port, device.credentials.as_ref())
            .await
        {
            Ok(()) => return DispatchOutcome::ok("management reboot issued"),
            Err(error) => error,
        };

        debug!(
            device = %device.name,
            error = %mgmt_err,
            "management reboot failed, falling back to protocol restart"
        );
        match command(self.control.as_ref(), device, CommandFrame::new("restart")).await {
            Ok(_) => DispatchOutcome::ok("protocol restart issued (management channel unavailable)"),
            Err(proto_err) => DispatchOutcome::from_proto_error(&proto_err),
        }
    }

    /// Status is dialect-independent: `stats` + `summary` + `pools`,
    /// merged into telemetry.
    pub async fn read_stats(&self, device: &Device) -> DispatchOutcome {
        match self.poll(device).await {
            Ok((telemetry, active_pools)) => {
                let hashrate = telemetry.hashrate_ghs.unwrap_or_default();
                DispatchOutcome {
                    telemetry: Some(telemetry),
                    ..DispatchOutcome::ok(format!(
                        "{hashrate:.0} GH/s, {active_pools} alive pool(s)"
                    ))
                }
            }
            Err(error) => DispatchOutcome::from_proto_error(&error),
        }
    }

    async fn poll(&self, device: &Device) -> Result<(Telemetry, usize), ProtoError> {
        let control = self.control.as_ref();

        let stats = decode_stats(&command(control, device, CommandFrame::new("stats")).await?)?;
        let summary =
            decode_summary(&command(control, device, CommandFrame::new("summary")).await?)?;
        let pools = decode_pools(&command(control, device, CommandFrame::new("pools")).await?)?;

        let active_pools = pools
            .pools
            .iter()
            .filter(|p| p.status.eq_ignore_ascii_case("alive"))
            .count();
        Ok((convert::telemetry(&stats, &summary), active_pools))
    }
}

fn fold(result: Result<DispatchOutcome, ProtoError>) -> DispatchOutcome {
    result.unwrap_or_else(|error| DispatchOutcome::from_proto_error(&error))
}

/// Send one frame and enforce a successful `STATUS` envelope.
async fn command(
    control: &dyn ControlChannel,
    device: &Device,
    frame: CommandFrame,
) -> Result<Value, ProtoError> {
    let value = control
        .send(&device.host, device.control_port, &frame)
        .await?;
    check_status(&value)?;
    Ok(value)
}

// ── Dialect implementations ─────────────────────────────────────────

fn ops(dialect: FirmwareDialect) -> &'static dyn DialectOps {
    match dialect {
        FirmwareDialect::Stock => &StockOps,
        FirmwareDialect::Luxos => &LuxosOps,
        FirmwareDialect::Vnish => &VnishOps,
        FirmwareDialect::Braiins => &BraiinsOps,
    }
}

/// Per-dialect low-power and wake primitives. Reboot and read-stats are
/// shared across dialects and live on [`Dispatcher`].
#[async_trait]
trait DialectOps: Send + Sync {
    async fn sleep(
        &self,
        control: &dyn ControlChannel,
        device: &Device,
    ) -> Result<DispatchOutcome, ProtoError>;

    async fn wake(
        &self,
        control: &dyn ControlChannel,
        device: &Device,
    ) -> Result<DispatchOutcome, ProtoError>;
}

/// Stock firmware has no low-power primitive at all. "Sleep" degrades
/// to a mining-process restart, which stops hashing only transiently.
/// This is a known behavioral gap of that firmware, surfaced via the
/// `degraded` flag rather than silently upgraded.
struct StockOps;

#[async_trait]
impl DialectOps for StockOps {
    async fn sleep(
        &self,
        control: &dyn ControlChannel,
        device: &Device,
    ) -> Result<DispatchOutcome, ProtoError> {
        command(control, device, CommandFrame::new("restart")).await?;
        Ok(DispatchOutcome::ok_degraded(
            "mining process restarted; stock firmware has no low-power state",
        ))
    }

    async fn wake(
        &self,
        control: &dyn ControlChannel,
        device: &Device,
    ) -> Result<DispatchOutcome, ProtoError> {
        command(control, device, CommandFrame::new("restart")).await?;
        Ok(DispatchOutcome::ok("mining process restarted"))
    }
}

/// LuxOS exposes a native `curtail` primitive, gated behind a logon
/// session: every curtail call needs a fresh session id.
struct LuxosOps;

impl LuxosOps {
    async fn curtail(
        control: &dyn ControlChannel,
        device: &Device,
        mode: &str,
    ) -> Result<(), ProtoError> {
        let logon = command(control, device, CommandFrame::new("logon")).await?;
        let session = logon
            .pointer("/SESSION/0/SessionID")
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .ok_or_else(|| ProtoError::Decode {
                message: "logon response missing SESSION[0].SessionID".into(),
                preview: logon.to_string(),
            })?;

        command(
            control,
            device,
            CommandFrame::with_parameter("curtail", format!("{session},{mode}")),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DialectOps for LuxosOps {
    async fn sleep(
        &self,
        control: &dyn ControlChannel,
        device: &Device,
    ) -> Result<DispatchOutcome, ProtoError> {
        Self::curtail(control, device, "sleep").await?;
        Ok(DispatchOutcome::ok("curtailed to low-power sleep"))
    }

    async fn wake(
        &self,
        control: &dyn ControlChannel,
        device: &Device,
    ) -> Result<DispatchOutcome, ProtoError> {
        Self::curtail(control, device, "wakeup").await?;
        Ok(DispatchOutcome::ok("curtail wakeup issued"))
    }
}

/// Vnish only exposes a frequency-scaling knob: sleep pins the core
/// frequency to zero, wake restores automatic tuning.
struct VnishOps;

#[async_trait]
impl DialectOps for VnishOps {
    async fn sleep(
        &self,
        control: &dyn ControlChannel,
        device: &Device,
    ) -> Result<DispatchOutcome, ProtoError> {
        command(
            control,
            device,
            CommandFrame::with_parameter("ascset", "0,freq,0"),
        )
        .await?;
        Ok(DispatchOutcome::ok("core frequency pinned to 0"))
    }

    async fn wake(
        &self,
        control: &dyn ControlChannel,
        device: &Device,
    ) -> Result<DispatchOutcome, ProtoError> {
        command(
            control,
            device,
            CommandFrame::with_parameter("ascset", "0,freq,auto"),
        )
        .await?;
        Ok(DispatchOutcome::ok("core frequency restored to auto"))
    }
}

/// Braiins OS: graceful software exit for sleep, process restart for
/// wake.
struct BraiinsOps;

#[async_trait]
impl DialectOps for BraiinsOps {
    async fn sleep(
        &self,
        control: &dyn ControlChannel,
        device: &Device,
    ) -> Result<DispatchOutcome, ProtoError> {
        command(control, device, CommandFrame::new("quit")).await?;
        Ok(DispatchOutcome::ok("soft exit issued"))
    }

    async fn wake(
        &self,
        control: &dyn ControlChannel,
        device: &Device,
    ) -> Result<DispatchOutcome, ProtoError> {
        command(control, device, CommandFrame::new("restart")).await?;
        Ok(DispatchOutcome::ok("mining process restarted"))
    }
}
