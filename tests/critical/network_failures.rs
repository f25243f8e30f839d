//! Unreachable hosts and timeouts map to retryable errors; the probe treats them as invalid.

use std::time::Duration;

use portal_session_core::{
    ClientConfig, CookieRecord, Credentials, LoginPhase, SessionError, SessionManager,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::support::socket_guard::start_mock_server_or_skip;

fn unreachable_manager(temp: &TempDir) -> SessionManager {
    // Nothing listens on the discard port locally.
    let config = ClientConfig {
        session_file: temp.path().join("session.json"),
        connect_timeout_secs: 2,
        read_timeout_secs: 2,
        ..ClientConfig::with_base_urls("http://127.0.0.1:9", "http://127.0.0.1:9")
    };
    SessionManager::new(config, Credentials::new("demo", "test")).expect("manager")
}

#[tokio::test]
async fn p0_unreachable_login_page_is_network_error() {
    let temp = TempDir::new().expect("temp dir");
    let mut manager = unreachable_manager(&temp);

    let error = manager.login().await.expect_err("login must fail");
    assert!(matches!(error, SessionError::Network(_)), "got {error:?}");
    assert!(error.is_retryable());
    assert_eq!(manager.phase(), LoginPhase::LoginFailed);
}

#[tokio::test]
async fn p0_unreachable_probe_reports_invalid_session() {
    let temp = TempDir::new().expect("temp dir");
    let mut manager = unreachable_manager(&temp);
    manager
        .store()
        .save_records(&[CookieRecord::new("127.0.0.1", "/", "sid", "v")])
        .expect("save");
    assert!(manager.restore());

    assert!(!manager.is_session_valid().await);
    assert!(!manager.session().is_authenticated());
}

#[tokio::test]
async fn p0_slow_login_page_times_out() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().expect("temp dir");
    let config = ClientConfig {
        session_file: temp.path().join("session.json"),
        read_timeout_secs: 1,
        ..ClientConfig::with_base_urls(mock_server.uri(), mock_server.uri())
    };
    let mut manager =
        SessionManager::new(config, Credentials::new("demo", "test")).expect("manager");

    let error = manager.login().await.expect_err("login must time out");
    assert!(matches!(error, SessionError::Network(_)), "got {error:?}");
    assert!(error.is_retryable());
}
