//! Session and credential values owned by a [`super::SessionManager`].

use std::fmt;
use std::sync::Arc;

use super::{CookieRecord, SessionJar};

/// Login identifier and secret, supplied once at startup.
///
/// The secret is redacted in Debug output.
#[derive(Clone)]
pub struct Credentials {
    identifier: String,
    secret: String,
}

impl Credentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    /// Returns the login identifier (username / email).
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns the login secret.
    ///
    /// Sensitive: avoid logging the return value.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// What the session is known to be, as far as the server is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No cookies at all.
    Empty,
    /// Cookies are present but have not been accepted by the server, either
    /// because they were just restored or because a probe rejected them.
    Unauthenticated,
    /// A login or validity probe succeeded with these cookies.
    Authenticated,
}

/// A cookie collection plus its authentication state.
///
/// The cookie jar is shared with the HTTP transport so responses update it
/// in place; everything else about the session is owned here.
#[derive(Debug)]
pub struct Session {
    jar: Arc<SessionJar>,
    state: SessionState,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            jar: Arc::new(SessionJar::new()),
            state: SessionState::Empty,
        }
    }

    /// Creates a session from persisted cookies; it stays unauthenticated
    /// until a probe confirms it.
    #[must_use]
    pub fn restored(cookies: Vec<CookieRecord>) -> Self {
        let jar = Arc::new(SessionJar::from_records(cookies));
        let state = if jar.is_empty() {
            SessionState::Empty
        } else {
            SessionState::Unauthenticated
        };
        Self { jar, state }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns `true` when the server last accepted this session.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    /// Returns the shared cookie jar.
    #[must_use]
    pub fn jar(&self) -> &Arc<SessionJar> {
        &self.jar
    }

    /// Returns a copy of the current cookies for persistence.
    #[must_use]
    pub fn snapshot(&self) -> Vec<CookieRecord> {
        self.jar.snapshot()
    }

    /// Moves `other`'s cookies and state into this session, keeping this
    /// session's jar so existing transports keep seeing it.
    pub(crate) fn adopt(&mut self, other: &Session) {
        self.jar.replace_all(other.snapshot());
        self.state = other.state;
    }

    pub(crate) fn mark_authenticated(&mut self) {
        self.state = SessionState::Authenticated;
    }

    pub(crate) fn mark_rejected(&mut self) {
        self.state = if self.jar.is_empty() {
            SessionState::Empty
        } else {
            SessionState::Unauthenticated
        };
    }
}
