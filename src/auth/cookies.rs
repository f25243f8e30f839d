//! Session cookie records and the reqwest cookie provider that holds them.
//!
//! [`SessionJar`] replaces `reqwest::cookie::Jar` so the full cookie set
//! (domain, path, expiry, flags) can be enumerated and snapshotted to disk,
//! which the stock jar does not allow.

use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::UNIX_EPOCH;

use reqwest::header::HeaderValue;
use tracing::{debug, warn};
use url::Url;

use crate::signer::unix_timestamp;

/// A single cookie held by a session.
///
/// Debug output redacts the value.
#[derive(Clone, PartialEq, Eq)]
pub struct CookieRecord {
    /// The domain the cookie belongs to, without a leading dot.
    pub domain: String,
    /// Whether the cookie is sent only to `domain` itself (no subdomains).
    pub host_only: bool,
    /// The URL path scope for the cookie.
    pub path: String,
    /// Whether the cookie should only be sent over HTTPS.
    pub secure: bool,
    /// Whether the server marked the cookie `HttpOnly`.
    pub http_only: bool,
    /// Unix timestamp for expiry (0 = session cookie).
    pub expires: u64,
    /// Cookie name.
    pub name: String,
    /// Cookie value (sensitive, never log).
    value: String,
}

impl CookieRecord {
    /// Creates a host-only, non-secure session cookie; adjust the public
    /// fields for anything else.
    #[must_use]
    pub fn new(
        domain: impl Into<String>,
        path: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            host_only: true,
            path: path.into(),
            secure: false,
            http_only: false,
            expires: 0,
            name: name.into(),
            value: value.into(),
        }
    }

    /// Returns the cookie value.
    ///
    /// Cookie values are sensitive; avoid logging the return value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns `true` when the cookie has an expiry at or before `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires != 0 && self.expires <= now
    }

    /// Returns `true` when this cookie should be attached to a request for `url`.
    #[must_use]
    pub fn matches(&self, url: &Url, now: u64) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        if self.is_expired_at(now) {
            return false;
        }
        if self.secure && url.scheme() != "https" {
            return false;
        }
        let host = host.to_ascii_lowercase();
        let domain_ok = if self.host_only {
            host == self.domain
        } else {
            domain_matches(&host, &self.domain)
        };
        domain_ok && path_matches(url.path(), &self.path)
    }

    fn same_identity(&self, other: &Self) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }
}

// Custom Debug impl that redacts the cookie value.
impl fmt::Debug for CookieRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieRecord")
            .field("domain", &self.domain)
            .field("host_only", &self.host_only)
            .field("path", &self.path)
            .field("secure", &self.secure)
            .field("http_only", &self.http_only)
            .field("expires", &self.expires)
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Errors that can occur while interpreting a `Set-Cookie` header.
#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    /// The header has no `name=value` pair or an empty name.
    #[error("malformed Set-Cookie header: {reason}")]
    Malformed {
        /// Description of what was wrong.
        reason: String,
    },

    /// The `Domain` attribute does not cover the responding host.
    #[error("cookie domain '{domain}' does not match host '{host}'")]
    DomainMismatch {
        /// Domain attribute from the header.
        domain: String,
        /// Host that sent the header.
        host: String,
    },
}

/// Parses one `Set-Cookie` header received from `url`.
///
/// `now` is the current Unix time, used to turn `Max-Age` into an absolute
/// expiry. A `Max-Age` of zero or less yields an already-expired record, which
/// [`SessionJar`] treats as a deletion.
///
/// # Errors
///
/// Returns [`CookieError`] when the header has no usable `name=value` pair or
/// its `Domain` attribute does not domain-match the responding host.
pub fn parse_set_cookie(header: &str, url: &Url, now: u64) -> Result<CookieRecord, CookieError> {
    let host = url
        .host_str()
        .ok_or_else(|| CookieError::Malformed {
            reason: "response URL has no host".to_string(),
        })?
        .to_ascii_lowercase();

    let mut parts = header.split(';');
    let pair = parts.next().unwrap_or_default();
    let Some((name, value)) = pair.split_once('=') else {
        return Err(CookieError::Malformed {
            reason: "missing '=' in name/value pair".to_string(),
        });
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(CookieError::Malformed {
            reason: "cookie name is empty".to_string(),
        });
    }

    let mut record = CookieRecord::new(host.clone(), default_path(url.path()), name, value.trim());
    let mut max_age: Option<i64> = None;

    for attribute in parts {
        let (key, attr_value) = match attribute.split_once('=') {
            Some((key, attr_value)) => (key.trim(), attr_value.trim()),
            None => (attribute.trim(), ""),
        };

        match key.to_ascii_lowercase().as_str() {
            "domain" => {
                let domain = attr_value.trim_start_matches('.').to_ascii_lowercase();
                if domain.is_empty() {
                    continue;
                }
                if !domain_matches(&host, &domain) {
                    return Err(CookieError::DomainMismatch { domain, host });
                }
                record.domain = domain;
                record.host_only = false;
            }
            "path" if attr_value.starts_with('/') => {
                record.path = attr_value.to_string();
            }
            "expires" => match httpdate::parse_http_date(attr_value) {
                Ok(time) => {
                    // Pre-epoch dates become 1 so they still read as expired.
                    record.expires = time
                        .duration_since(UNIX_EPOCH)
                        .map_or(1, |d| d.as_secs().max(1));
                }
                Err(_) => {
                    warn!(
                        name = %record.name,
                        expires = attr_value,
                        "unparseable cookie expiry; treating as session cookie"
                    );
                }
            },
            "max-age" => {
                if let Ok(seconds) = attr_value.parse::<i64>() {
                    max_age = Some(seconds);
                }
            }
            "secure" => record.secure = true,
            "httponly" => record.http_only = true,
            _ => {}
        }
    }

    // Max-Age wins over Expires (RFC 6265 §5.3 step 3).
    if let Some(seconds) = max_age {
        record.expires = match u64::try_from(seconds) {
            Ok(seconds) if seconds > 0 => now.saturating_add(seconds),
            _ => 1,
        };
    }

    Ok(record)
}

/// Returns `true` when `host` equals `domain` or is a subdomain of it.
fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// RFC 6265 path-match.
fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

/// RFC 6265 default-path: the request path up to (not including) its last `/`.
fn default_path(request_path: &str) -> String {
    if !request_path.starts_with('/') {
        return "/".to_string();
    }
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => request_path[..index].to_string(),
    }
}

/// In-memory cookie collection shared between a [`super::Session`] and the
/// HTTP client.
///
/// Implements [`reqwest::cookie::CookieStore`], so it can be passed to
/// `ClientBuilder::cookie_provider()`; every `Set-Cookie` the client sees
/// lands here and every request reads from here.
#[derive(Debug, Default)]
pub struct SessionJar {
    cookies: RwLock<Vec<CookieRecord>>,
}

impl SessionJar {
    /// Creates an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a jar pre-populated with `records`, dropping any already expired.
    #[must_use]
    pub fn from_records(records: Vec<CookieRecord>) -> Self {
        let jar = Self::new();
        jar.replace_all(records);
        jar
    }

    /// Inserts or replaces a cookie with the same name, domain and path.
    ///
    /// An expired record removes the stored cookie instead.
    pub fn insert(&self, record: CookieRecord) {
        let now = unix_timestamp();
        let mut cookies = self.write();
        cookies.retain(|existing| !existing.same_identity(&record));
        if record.is_expired_at(now) {
            debug!(name = %record.name, domain = %record.domain, "removed expired cookie");
        } else {
            debug!(name = %record.name, domain = %record.domain, "stored cookie");
            cookies.push(record);
        }
    }

    /// Replaces the whole cookie set.
    pub fn replace_all(&self, records: Vec<CookieRecord>) {
        let now = unix_timestamp();
        let mut cookies = self.write();
        cookies.clear();
        for record in records {
            if record.is_expired_at(now) {
                continue;
            }
            cookies.retain(|existing| !existing.same_identity(&record));
            cookies.push(record);
        }
    }

    /// Returns a copy of every unexpired cookie, in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<CookieRecord> {
        let now = unix_timestamp();
        self.read()
            .iter()
            .filter(|cookie| !cookie.is_expired_at(now))
            .cloned()
            .collect()
    }

    /// Removes every cookie.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Returns the number of unexpired cookies.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = unix_timestamp();
        self.read()
            .iter()
            .filter(|cookie| !cookie.is_expired_at(now))
            .count()
    }

    /// Returns `true` when the jar holds no unexpired cookies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds the `Cookie` request header value for `url`, if any cookie matches.
    #[must_use]
    pub fn header_for(&self, url: &Url) -> Option<String> {
        let now = unix_timestamp();
        let pairs = self
            .read()
            .iter()
            .filter(|cookie| cookie.matches(url, now))
            .map(|cookie| format!("{}={}", cookie.name, cookie.value()))
            .collect::<Vec<_>>();
        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<CookieRecord>> {
        self.cookies.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<CookieRecord>> {
        self.cookies.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl reqwest::cookie::CookieStore for SessionJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let now = unix_timestamp();
        for header in cookie_headers {
            let Ok(raw) = header.to_str() else {
                warn!(url = %url, "skipping non-ASCII Set-Cookie header");
                continue;
            };
            match parse_set_cookie(raw, url, now) {
                Ok(record) => self.insert(record),
                Err(error) => warn!(url = %url, reason = %error, "rejected Set-Cookie header"),
            }
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.header_for(url)
            .and_then(|header| HeaderValue::from_str(&header).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::cookie::CookieStore;

    fn url(s: &str) -> Url {
        s.parse::<Url>().unwrap()
    }

    const NOW: u64 = 1_700_000_000;

    // ---- Set-Cookie parsing ----

    #[test]
    fn test_parse_set_cookie_host_only_defaults() {
        let record =
            parse_set_cookie("sid=abc123", &url("https://portal.example.com/login"), NOW).unwrap();
        assert_eq!(record.name, "sid");
        assert_eq!(record.value(), "abc123");
        assert_eq!(record.domain, "portal.example.com");
        assert!(record.host_only);
        assert_eq!(record.path, "/");
        assert_eq!(record.expires, 0);
        assert!(!record.secure);
    }

    #[test]
    fn test_parse_set_cookie_all_attributes() {
        let record = parse_set_cookie(
            "sid=v; Domain=.example.com; Path=/app; Expires=Wed, 21 Oct 2037 07:28:00 GMT; Secure; HttpOnly",
            &url("https://portal.example.com/login"),
            NOW,
        )
        .unwrap();
        assert_eq!(record.domain, "example.com");
        assert!(!record.host_only);
        assert_eq!(record.path, "/app");
        assert!(record.secure);
        assert!(record.http_only);
        assert_eq!(record.expires, 2_139_722_880);
    }

    #[test]
    fn test_parse_set_cookie_max_age_overrides_expires() {
        let record = parse_set_cookie(
            "sid=v; Max-Age=60; Expires=Wed, 21 Oct 2037 07:28:00 GMT",
            &url("https://example.com/"),
            NOW,
        )
        .unwrap();
        assert_eq!(record.expires, NOW + 60);
    }

    #[test]
    fn test_parse_set_cookie_zero_max_age_is_expired() {
        let record =
            parse_set_cookie("sid=; Max-Age=0", &url("https://example.com/"), NOW).unwrap();
        assert!(record.is_expired_at(NOW));
    }

    #[test]
    fn test_parse_set_cookie_default_path_from_request() {
        let record =
            parse_set_cookie("a=b", &url("https://example.com/settings/tokens"), NOW).unwrap();
        assert_eq!(record.path, "/settings");
    }

    #[test]
    fn test_parse_set_cookie_rejects_foreign_domain() {
        let result = parse_set_cookie(
            "sid=v; Domain=other.com",
            &url("https://portal.example.com/"),
            NOW,
        );
        assert!(matches!(result, Err(CookieError::DomainMismatch { .. })));
    }

    #[test]
    fn test_parse_set_cookie_rejects_missing_pair() {
        let result = parse_set_cookie("garbage", &url("https://example.com/"), NOW);
        assert!(matches!(result, Err(CookieError::Malformed { .. })));

        let result = parse_set_cookie("=value", &url("https://example.com/"), NOW);
        assert!(matches!(result, Err(CookieError::Malformed { .. })));
    }

    // ---- Matching ----

    #[test]
    fn test_domain_cookie_matches_subdomain_but_not_lookalike() {
        let mut record = CookieRecord::new("example.com", "/", "sid", "v");
        record.host_only = false;
        assert!(record.matches(&url("https://api.example.com/x"), NOW));
        assert!(record.matches(&url("https://example.com/x"), NOW));
        assert!(!record.matches(&url("https://badexample.com/x"), NOW));
    }

    #[test]
    fn test_host_only_cookie_does_not_match_subdomain() {
        let record = CookieRecord::new("example.com", "/", "sid", "v");
        assert!(!record.matches(&url("https://api.example.com/"), NOW));
    }

    #[test]
    fn test_path_matching() {
        let record = CookieRecord::new("example.com", "/api", "sid", "v");
        assert!(record.matches(&url("http://example.com/api"), NOW));
        assert!(record.matches(&url("http://example.com/api/settings"), NOW));
        assert!(!record.matches(&url("http://example.com/apix"), NOW));
        assert!(!record.matches(&url("http://example.com/"), NOW));
    }

    #[test]
    fn test_secure_cookie_not_sent_over_http() {
        let mut record = CookieRecord::new("example.com", "/", "sid", "v");
        record.secure = true;
        assert!(record.matches(&url("https://example.com/"), NOW));
        assert!(!record.matches(&url("http://example.com/"), NOW));
    }

    #[test]
    fn test_expired_cookie_does_not_match() {
        let mut record = CookieRecord::new("example.com", "/", "sid", "v");
        record.expires = NOW - 1;
        assert!(!record.matches(&url("https://example.com/"), NOW));
    }

    // ---- Jar ----

    #[test]
    fn test_jar_set_cookies_then_cookies_header() {
        let jar = SessionJar::new();
        let origin = url("https://portal.example.com/login");
        let headers = [
            HeaderValue::from_static("sid=abc; Path=/"),
            HeaderValue::from_static("theme=dark; Path=/"),
        ];
        jar.set_cookies(&mut headers.iter(), &origin);

        let header = jar.cookies(&url("https://portal.example.com/api/users")).unwrap();
        assert_eq!(header.to_str().unwrap(), "sid=abc; theme=dark");
        assert!(jar.cookies(&url("https://other.com/")).is_none());
    }

    #[test]
    fn test_jar_replaces_cookie_with_same_identity() {
        let jar = SessionJar::new();
        jar.insert(CookieRecord::new("example.com", "/", "sid", "old"));
        jar.insert(CookieRecord::new("example.com", "/", "sid", "new"));
        let snapshot = jar.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].value(), "new");
    }

    #[test]
    fn test_jar_expired_insert_deletes() {
        let jar = SessionJar::new();
        jar.insert(CookieRecord::new("example.com", "/", "sid", "v"));
        let mut deletion = CookieRecord::new("example.com", "/", "sid", "");
        deletion.expires = 1;
        jar.insert(deletion);
        assert!(jar.is_empty());
    }

    #[test]
    fn test_jar_from_records_drops_expired() {
        let mut stale = CookieRecord::new("example.com", "/", "old", "v");
        stale.expires = 1;
        let fresh = CookieRecord::new("example.com", "/", "new", "v");
        let jar = SessionJar::from_records(vec![stale, fresh]);
        assert_eq!(jar.len(), 1);
        assert_eq!(jar.snapshot()[0].name, "new");
    }

    #[test]
    fn test_jar_clear() {
        let jar = SessionJar::from_records(vec![CookieRecord::new("example.com", "/", "a", "b")]);
        jar.clear();
        assert!(jar.is_empty());
        assert!(jar.header_for(&url("https://example.com/")).is_none());
    }

    // ---- Debug redaction ----

    #[test]
    fn test_cookie_record_debug_redacts_value() {
        let cookie = CookieRecord::new("example.com", "/", "session", "super_secret_token");
        let debug_str = format!("{cookie:?}");
        assert!(debug_str.contains("[REDACTED]"));
        assert!(
            !debug_str.contains("super_secret_token"),
            "Debug output must NOT contain the actual value"
        );
    }
}
