//! Secrets must not surface in Debug output or error messages.

use portal_session_core::{
    ClientConfig, CookieRecord, Credentials, RequestSigner, SessionError, SessionManager,
};
use tempfile::TempDir;

#[test]
fn p0_credentials_debug_hides_secret() {
    let credentials = Credentials::new("demo@example.org", "hunter2-secret");
    let rendered = format!("{credentials:?}");
    assert!(!rendered.contains("hunter2-secret"), "{rendered}");
}

#[test]
fn p0_cookie_debug_hides_value() {
    let cookie = CookieRecord::new("127.0.0.1", "/", "JSESSIONID", "session-value-xyz");
    let rendered = format!("{cookie:?}");
    assert!(rendered.contains("JSESSIONID"));
    assert!(!rendered.contains("session-value-xyz"), "{rendered}");
}

#[test]
fn p0_signer_and_config_debug_hide_signing_secret() {
    let signer = RequestSigner::new("signing-secret-abc");
    assert!(!format!("{signer:?}").contains("signing-secret-abc"));

    let config = ClientConfig {
        signing_secret: "signing-secret-abc".to_string(),
        ..ClientConfig::default()
    };
    assert!(!format!("{config:?}").contains("signing-secret-abc"));
}

#[test]
fn p0_manager_debug_hides_login_secret() {
    let temp = TempDir::new().expect("temp dir");
    let config = ClientConfig {
        session_file: temp.path().join("session.json"),
        ..ClientConfig::with_base_urls("http://127.0.0.1:9", "http://127.0.0.1:9")
    };
    let manager = SessionManager::new(config, Credentials::new("demo", "hunter2-secret"))
        .expect("manager");
    assert!(!format!("{manager:?}").contains("hunter2-secret"));
}

#[tokio::test]
async fn p0_login_failure_message_omits_password() {
    let Some(mock_server) = crate::support::socket_guard::start_mock_server_or_skip().await else {
        return;
    };
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(crate::support::portal::login_page(Some("n-1"))),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().expect("temp dir");
    let mut manager =
        crate::support::portal::manager_for(&mock_server, &temp.path().join("session.json"));
    let error = manager.login().await.expect_err("login must fail");

    assert!(matches!(error, SessionError::LoginFailed { status: 403, .. }));
    let password_field = format!("password={}", crate::support::portal::SECRET);
    assert!(!error.to_string().contains(&password_field));
    assert!(!format!("{error:?}").contains(&password_field));
}
