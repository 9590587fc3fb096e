// ── Management channel client ──
//
// The optional HTTP interface on each device, used here for exactly one
// thing: the reboot fallback. Fixed path, HTTP GET, Basic auth with the
// device's stored credentials.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

use crate::error::Error;

/// Fixed reboot endpoint exposed by every supported management interface.
pub const REBOOT_PATH: &str = "/cgi-bin/reboot.cgi";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Credentials for a device's HTTP management interface.
///
/// The password round-trips through the registry's persisted form, so it
/// opts into serialization explicitly (secrecy blocks it by default).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpCredentials {
    pub username: String,
    #[serde(serialize_with = "serialize_secret")]
    pub password: SecretString,
}

fn serialize_secret<S: Serializer>(secret: &SecretString, ser: S) -> Result<S::Ok, S::Error> {
    ser.serialize_str(secret.expose_secret())
}

/// Injectable seam for the HTTP management channel.
#[async_trait]
pub trait ManagementChannel: Send + Sync {
    /// Trigger a reboot via the management interface. Succeeds only on a
    /// 2xx response; everything else is an [`Error::Http`].
    async fn reboot(
        &self,
        host: &str,
        port: u16,
        credentials: Option<&HttpCredentials>,
    ) -> Result<(), Error>;
}

/// Production [`ManagementChannel`] over reqwest.
#[derive(Debug, Clone)]
pub struct HttpManagementChannel {
    http: reqwest::Client,
}

impl HttpManagementChannel {
    pub fn new() -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::Http {
                status: None,
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http })
    }

    /// Build with a pre-configured client (tests, custom timeouts).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ManagementChannel for HttpManagementChannel {
    async fn reboot(
        &self,
        host: &str,
        port: u16,
        credentials: Option<&HttpCredentials>,
    ) -> Result<(), Error> {
        let url = format!("http://{host}:{port}{REBOOT_PATH}");
        debug!(host, port, "issuing management reboot");

        let mut request = self.http.get(&url);
        if let Some(creds) = credentials {
            request = request.basic_auth(&creds.username, Some(creds.password.expose_secret()));
        }

        let response = request.send().await.map_err(|e| Error::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::Http {
                status: Some(status.as_u16()),
                message: format!("reboot endpoint returned {status}"),
            })
        }
    }
}
