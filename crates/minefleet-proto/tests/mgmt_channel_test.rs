#![allow(clippy::unwrap_used)]
// Integration tests for `HttpManagementChannel` using wiremock.

use secrecy::SecretString;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use minefleet_proto::{Error, HttpCredentials, HttpManagementChannel, ManagementChannel};

async fn setup() -> (MockServer, String, u16) {
    let server = MockServer::start().await;
    let host = server.address().ip().to_string();
    let port = server.address().port();
    (server, host, port)
}

#[tokio::test]
async fn reboot_succeeds_on_200() {
    let (server, host, port) = setup().await;

    Mock::given(method("GET"))
        .and(path("/cgi-bin/reboot.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string("rebooting"))
        .expect(1)
        .mount(&server)
        .await;

    let channel = HttpManagementChannel::new().unwrap();
    channel.reboot(&host, port, None).await.unwrap();
}

#[tokio::test]
async fn reboot_sends_basic_auth() {
    let (server, host, port) = setup().await;

    Mock::given(method("GET"))
        .and(path("/cgi-bin/reboot.cgi"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let credentials = HttpCredentials {
        username: "root".into(),
        password: SecretString::from("hunter2".to_owned()),
    };

    let channel = HttpManagementChannel::new().unwrap();
    channel.reboot(&host, port, Some(&credentials)).await.unwrap();
}

#[tokio::test]
async fn reboot_fails_on_401() {
    let (server, host, port) = setup().await;

    Mock::given(method("GET"))
        .and(path("/cgi-bin/reboot.cgi"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let channel = HttpManagementChannel::new().unwrap();
    let err = channel.reboot(&host, port, None).await.unwrap_err();

    assert!(
        matches!(err, Error::Http { status: Some(401), .. }),
        "expected HTTP 401 error, got {err:?}"
    );
}
