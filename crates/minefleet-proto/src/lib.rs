//! Wire-level clients for network-attached ASIC miners.
//!
//! Miners expose two independent surfaces, both modeled here:
//!
//! - **Control channel** — a line-oriented TCP protocol: one short-lived
//!   connection per command, a single JSON frame each way, responses
//!   terminated by NUL byte(s). No authentication (trusted network).
//!   See [`ControlChannel`] / [`TcpControlChannel`].
//!
//! - **Management channel** — an optional HTTP interface used only as the
//!   reboot fallback, authenticated with HTTP Basic using per-device
//!   credentials. See [`ManagementChannel`] / [`HttpManagementChannel`].
//!
//! Both channels are traits so the fleet layer can be tested against
//! scripted fakes without opening sockets. Typed response schemas for the
//! `stats` / `summary` / `pools` commands live in [`response`]; anything
//! that does not decode into them fails closed with [`Error::Decode`].

pub mod control;
pub mod error;
pub mod frame;
pub mod mgmt;
pub mod response;

pub use control::{ControlChannel, DEFAULT_READ_TIMEOUT, TcpControlChannel};
pub use error::Error;
pub use frame::CommandFrame;
pub use mgmt::{HttpCredentials, HttpManagementChannel, ManagementChannel};
pub use response::{
    PoolEntry, PoolsResponse, StatsEntry, StatsResponse, StatusLine, Summary, SummaryResponse,
};
