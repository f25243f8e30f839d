//! Shared User-Agent string for portal traffic.

/// Project URL for User-Agent identification (good citizenship; RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/portal-session";

/// Default User-Agent for every portal request.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("portal-session/{version} (+{PROJECT_UA_URL})")
}
