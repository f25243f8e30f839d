//! Client configuration: portal endpoints, timeouts, signing secret and
//! session snapshot location.

use std::fmt;
use std::path::PathBuf;

use crate::auth::default_session_path;

/// Web host serving the login form, the token page and the users list.
pub const DEFAULT_BASE_URL: &str = "https://challenge.sunvoy.com";
/// API host serving the signed settings endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.challenge.sunvoy.com";
/// Shared HMAC secret the portal verifies `checkcode` with.
pub const DEFAULT_SIGNING_SECRET: &str = "mys3cr3t";
/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default whole-request timeout in seconds.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;
/// Snapshot file used when no per-user config dir can be determined.
const FALLBACK_SESSION_FILE: &str = "session.json";

/// Login page (GET for the nonce, POST for credentials).
pub const LOGIN_PATH: &str = "/login";
/// Settings page carrying the hidden signing tokens.
pub const TOKENS_PATH: &str = "/settings/tokens";
/// Signed account endpoint, also used as the validity probe (API host).
pub const SETTINGS_PATH: &str = "/api/settings";
/// Users list endpoint (web host).
pub const USERS_PATH: &str = "/api/users";

/// Runtime configuration for a [`crate::SessionManager`].
#[derive(Clone)]
pub struct ClientConfig {
    /// Web host base URL, without trailing slash.
    pub base_url: String,
    /// API host base URL, without trailing slash.
    pub api_base_url: String,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub read_timeout_secs: u64,
    /// Shared HMAC secret (redacted in Debug output).
    pub signing_secret: String,
    /// Session snapshot file.
    pub session_file: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            signing_secret: DEFAULT_SIGNING_SECRET.to_string(),
            session_file: default_session_path()
                .unwrap_or_else(|_| PathBuf::from(FALLBACK_SESSION_FILE)),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_base_url", &self.api_base_url)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("read_timeout_secs", &self.read_timeout_secs)
            .field("signing_secret", &"[REDACTED]")
            .field("session_file", &self.session_file)
            .finish()
    }
}

impl ClientConfig {
    /// Default configuration with both hosts replaced, e.g. for a local mock.
    #[must_use]
    pub fn with_base_urls(base_url: impl Into<String>, api_base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    /// Absolute URL of `path` on the web host.
    #[must_use]
    pub fn web_url(&self, path: &str) -> String {
        join(&self.base_url, path)
    }

    /// Absolute URL of `path` on the API host.
    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        join(&self.api_base_url, path)
    }
}

fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
