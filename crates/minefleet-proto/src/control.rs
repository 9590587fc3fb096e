// ── Control channel client ──
//
// One TCP connection per command, no pooling or reuse: the devices are
// embedded controllers with very limited concurrent-connection capacity,
// and the protocol is strictly request/response over a fresh socket.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::error::Error;
use crate::frame::{CommandFrame, decode_response};

/// Hard per-call read timeout. There is deliberately no batch-level
/// deadline above this -- callers own their own fan-out policy.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

const READ_CHUNK: usize = 4096;

/// Injectable seam for the framed control channel.
///
/// The fleet layer only ever talks to devices through this trait, which
/// keeps batch orchestration testable with scripted outcomes instead of
/// real sockets.
#[async_trait]
pub trait ControlChannel: Send + Sync {
    /// Send one command frame to `host:port` and return the decoded
    /// response value. Stateless per call; no registry side effects.
    async fn send(&self, host: &str, port: u16, frame: &CommandFrame) -> Result<Value, Error>;
}

/// Production [`ControlChannel`] over raw TCP.
#[derive(Debug, Clone)]
pub struct TcpControlChannel {
    read_timeout: Duration,
}

impl TcpControlChannel {
    pub fn new() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Override the read timeout (used by tests and by config profiles).
    pub fn with_timeout(read_timeout: Duration) -> Self {
        Self { read_timeout }
    }

    async fn exchange(&self, host: &str, port: u16, frame: &CommandFrame) -> Result<Vec<u8>, Error> {
        let transport = |source: std::io::Error| Error::Transport {
            host: host.to_owned(),
            port,
            source,
        };

        let mut stream = TcpStream::connect((host, port)).await.map_err(transport)?;
        trace!(host, port, command = %frame.command, "control channel connected");

        stream.write_all(&frame.encode()).await.map_err(transport)?;
        // Signal end-of-request; several firmwares wait for it before replying.
        stream.shutdown().await.map_err(transport)?;

        let mut response = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let read = stream.read(&mut chunk).await.map_err(transport)?;
            if read == 0 {
                break;
            }
            response.extend_from_slice(&chunk[..read]);
            // NUL terminates the frame even if the peer keeps the socket open.
            if chunk[..read].contains(&0) {
                break;
            }
        }

        if response.is_empty() {
            return Err(Error::EmptyResponse {
                host: host.to_owned(),
                port,
            });
        }
        Ok(response)
    }
}

impl Default for TcpControlChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ControlChannel for TcpControlChannel {
    async fn send(&self, host: &str, port: u16, frame: &CommandFrame) -> Result<Value, Error> {
        debug!(host, port, command = %frame.command, "sending control command");

        let raw = timeout(self.read_timeout, self.exchange(host, port, frame))
            .await
            .map_err(|_| Error::Timeout {
                host: host.to_owned(),
                port,
                timeout_secs: self.read_timeout.as_secs(),
            })??;

        decode_response(&raw)
    }
}
