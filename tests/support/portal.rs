//! Mock portal endpoints shared by the integration tests.

use std::path::Path;

use portal_session_core::{ClientConfig, Credentials, RequestSigner, SessionManager};
use wiremock::matchers::{body_string_contains, header_regex, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

pub const IDENTIFIER: &str = "demo@example.org";
pub const SECRET: &str = "test";
pub const NONCE: &str = "a1b2c3d4";
pub const SESSION_COOKIE: &str = "JSESSIONID";
pub const SESSION_VALUE: &str = "live-session-1";

#[must_use]
pub fn login_page(nonce: Option<&str>) -> String {
    let nonce_input = nonce
        .map(|value| format!(r#"<input type="hidden" name="nonce" value="{value}">"#))
        .unwrap_or_default();
    format!(
        r#"<html><body><form method="post" action="/login">
{nonce_input}
<input type="text" name="username">
<input type="password" name="password">
</form></body></html>"#
    )
}

#[must_use]
pub fn tokens_page() -> &'static str {
    r#"<html><body>
<input type="hidden" id="access_token" value="tok-123">
<input type="hidden" id="openId" value="open-456">
<input type="hidden" id="userId" value="user-789">
<input type="hidden" id="apiuser" value="demo@example.org">
<input type="text" id="visible" value="ignored">
</body></html>"#
}

#[must_use]
pub fn manager_for(server: &MockServer, session_file: &Path) -> SessionManager {
    let config = ClientConfig {
        session_file: session_file.to_path_buf(),
        ..ClientConfig::with_base_urls(server.uri(), server.uri())
    };
    SessionManager::new(config, Credentials::new(IDENTIFIER, SECRET))
        .expect("manager should build")
}

/// Mounts `GET /login` (with nonce) and a `POST /login` answering 302 with a session cookie.
pub async fn mount_login(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_page(Some(NONCE))))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string_contains("username=demo%40example.org"))
        .and(body_string_contains("password=test"))
        .and(body_string_contains(format!("nonce={NONCE}")))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", "/list")
                .insert_header(
                    "set-cookie",
                    format!("{SESSION_COOKIE}={SESSION_VALUE}; Path=/; HttpOnly").as_str(),
                ),
        )
        .expect(1)
        .mount(server)
        .await;
}

/// Mounts the settings probe: 200 with the live cookie, 401 otherwise.
pub async fn mount_settings_probe(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/settings"))
        .and(header_regex(
            "cookie",
            &format!("{SESSION_COOKIE}={SESSION_VALUE}"),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_user_json()))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/settings"))
        .respond_with(ResponseTemplate::new(401))
        .with_priority(10)
        .mount(server)
        .await;
}

#[must_use]
pub fn current_user_json() -> serde_json::Value {
    serde_json::json!({
        "id": "user-789",
        "firstName": "Demo",
        "lastName": "User",
        "email": "demo@example.org",
    })
}

/// Matches a form body whose `checkcode` is the HMAC of everything before it.
pub struct ValidCheckcode {
    signer: RequestSigner,
}

impl ValidCheckcode {
    #[must_use]
    pub fn with_secret(secret: &str) -> Self {
        Self {
            signer: RequestSigner::new(secret),
        }
    }
}

impl Match for ValidCheckcode {
    fn matches(&self, request: &Request) -> bool {
        let body = String::from_utf8_lossy(&request.body);
        let Some((canonical, checkcode)) = body.rsplit_once("&checkcode=") else {
            return false;
        };
        self.signer
            .checkcode(canonical)
            .is_ok_and(|expected| expected == checkcode)
    }
}
