//! Session orchestration: restore, validity probe, nonce login, protected calls.
//!
//! # Login state machine
//!
//! ```text
//! NoSession -> FetchingNonce -> NonceReady -> LoginSubmitted -> Authenticated
//!                   |               |               |
//!                   +---------------+---------------+--------> LoginFailed
//! ```
//!
//! Only an unfollowed `302` answer to the credentials POST reaches
//! `Authenticated`. The redirect target is not checked.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::{CookieStore, Credentials, Session, SessionError, SessionState};
use crate::account::{UserRecord, decode_user, decode_users};
use crate::config::{ClientConfig, LOGIN_PATH, SETTINGS_PATH, TOKENS_PATH, USERS_PATH};
use crate::extract::{extract_nonce, extract_tokens};
use crate::signer::{RequestSigner, SignedPayload};
use crate::transport::HttpTransport;

/// Status the portal answers a successful credentials POST with.
const LOGIN_SUCCESS_STATUS: u16 = 302;

/// Position of the manager in the login state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPhase {
    /// No login attempted yet (or a new attempt is starting).
    NoSession,
    /// Login page requested.
    FetchingNonce,
    /// Nonce extracted, credentials not yet sent.
    NonceReady,
    /// Credentials POST sent.
    LoginSubmitted,
    /// Login or validity probe succeeded.
    Authenticated,
    /// The last attempt failed.
    LoginFailed,
}

/// Owns one session and everything needed to establish and use it.
///
/// Each manager has its own cookie jar, transport and snapshot file; run
/// independent managers for independent sessions.
#[derive(Debug)]
pub struct SessionManager {
    config: ClientConfig,
    credentials: Credentials,
    store: CookieStore,
    session: Session,
    transport: HttpTransport,
    signer: RequestSigner,
    phase: LoginPhase,
    restore_enabled: bool,
}

impl SessionManager {
    /// Creates a manager persisting to `config.session_file`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Network`] when the HTTP client cannot be built.
    pub fn new(config: ClientConfig, credentials: Credentials) -> Result<Self, SessionError> {
        let store = CookieStore::new(config.session_file.clone());
        Self::with_store(config, credentials, store)
    }

    /// Creates a manager persisting through `store`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Network`] when the HTTP client cannot be built.
    pub fn with_store(
        config: ClientConfig,
        credentials: Credentials,
        store: CookieStore,
    ) -> Result<Self, SessionError> {
        let session = Session::new();
        let transport = HttpTransport::new(&config, Arc::clone(session.jar()))?;
        let signer = RequestSigner::new(config.signing_secret.clone());
        Ok(Self {
            config,
            credentials,
            store,
            session,
            transport,
            signer,
            phase: LoginPhase::NoSession,
            restore_enabled: true,
        })
    }

    /// Disables restoring the persisted snapshot; the next
    /// [`ensure_session`](Self::ensure_session) always logs in afresh.
    #[must_use]
    pub fn without_restore(mut self) -> Self {
        self.restore_enabled = false;
        self
    }

    /// Returns the session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the current login phase.
    #[must_use]
    pub fn phase(&self) -> LoginPhase {
        self.phase
    }

    /// Returns the snapshot store.
    #[must_use]
    pub fn store(&self) -> &CookieStore {
        &self.store
    }

    /// Returns the authenticated transport for additional calls.
    #[must_use]
    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    /// Makes sure the session is authenticated.
    ///
    /// Restores the persisted snapshot (unless disabled or already
    /// authenticated), probes it, and runs the login flow only when the probe
    /// fails. A fresh login is persisted; a failure to persist is logged but
    /// does not fail the call since the live session is usable.
    ///
    /// # Errors
    ///
    /// Returns the [`SessionError`] of the failed login step.
    #[instrument(level = "debug", skip(self))]
    pub async fn ensure_session(&mut self) -> Result<(), SessionError> {
        if self.restore_enabled && !self.session.is_authenticated() {
            self.restore();
        }

        if self.is_session_valid().await {
            info!("Reusing saved session");
            self.phase = LoginPhase::Authenticated;
            return Ok(());
        }

        self.login().await?;

        if let Err(error) = self.persist() {
            warn!(error = %error, "Failed to save session cookies; continuing with live session");
        }
        Ok(())
    }

    /// Replaces the session's cookies with the persisted snapshot, if any.
    ///
    /// Returns `true` when a snapshot was loaded.
    pub fn restore(&mut self) -> bool {
        match self.store.load() {
            Some(restored) => {
                self.session.adopt(&restored);
                true
            }
            None => false,
        }
    }

    /// Writes the current cookies to the snapshot store.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] when the snapshot cannot be written.
    pub fn persist(&self) -> Result<(), SessionError> {
        self.store.save(&self.session)?;
        info!(path = %self.store.path().display(), "Session cookies saved");
        Ok(())
    }

    /// Probes the API with the current cookies.
    ///
    /// `true` only for an HTTP 200. An empty session is never valid and is
    /// not probed; network failures count as invalid.
    pub async fn is_session_valid(&mut self) -> bool {
        if self.session.state() == SessionState::Empty {
            debug!("session has no cookies; skipping validity probe");
            return false;
        }

        let probe_url = self.config.api_url(SETTINGS_PATH);
        match self.transport.post_empty(&probe_url).await {
            Ok(response) if response.is_ok() => {
                self.session.mark_authenticated();
                true
            }
            Ok(response) => {
                debug!(status = response.status, "session rejected by validity probe");
                self.session.mark_rejected();
                false
            }
            Err(error) => {
                debug!(error = %error, "validity probe failed");
                self.session.mark_rejected();
                false
            }
        }
    }

    /// Runs the nonce login flow from `NoSession`.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Network`] / [`SessionError::HttpStatus`] when the login page cannot be fetched
    /// - [`SessionError::NonceNotFound`] when the page has no nonce field
    /// - [`SessionError::LoginFailed`] when the credentials POST does not answer 302
    pub async fn login(&mut self) -> Result<(), SessionError> {
        self.transition(LoginPhase::NoSession);
        match self.run_login().await {
            Ok(()) => {
                self.session.mark_authenticated();
                self.transition(LoginPhase::Authenticated);
                info!("Login successful");
                Ok(())
            }
            Err(error) => {
                self.session.mark_rejected();
                self.transition(LoginPhase::LoginFailed);
                warn!(error = %error, "Login failed");
                Err(error)
            }
        }
    }

    async fn run_login(&mut self) -> Result<(), SessionError> {
        let login_url = self.config.web_url(LOGIN_PATH);

        self.transition(LoginPhase::FetchingNonce);
        let page = self.transport.get(&login_url).await?;
        if !page.is_ok() {
            return Err(SessionError::HttpStatus {
                url: login_url,
                status: page.status,
            });
        }
        let Some(nonce) = extract_nonce(&page.body)? else {
            return Err(SessionError::NonceNotFound { url: login_url });
        };
        self.transition(LoginPhase::NonceReady);

        let response = self
            .transport
            .post_form(
                &login_url,
                &[
                    ("username", self.credentials.identifier()),
                    ("password", self.credentials.secret()),
                    ("nonce", nonce.as_str()),
                ],
            )
            .await?;
        drop(nonce);
        self.transition(LoginPhase::LoginSubmitted);

        if response.status != LOGIN_SUCCESS_STATUS {
            return Err(SessionError::login_failed(response.status, &response.body));
        }
        debug!(location = ?response.location, "login redirect received");
        Ok(())
    }

    /// Builds a signed payload from the hidden tokens on the settings page.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the page cannot be fetched, carries no
    /// tokens, or the tokens use a reserved key.
    pub async fn signed_settings_payload(&self) -> Result<SignedPayload, SessionError> {
        let tokens_url = self.config.web_url(TOKENS_PATH);
        let page = self.transport.get(&tokens_url).await?;
        if !page.is_ok() {
            return Err(SessionError::HttpStatus {
                url: tokens_url,
                status: page.status,
            });
        }

        let tokens = extract_tokens(&page.body)?;
        if tokens.is_empty() {
            return Err(SessionError::upstream(
                TOKENS_PATH,
                "no hidden token fields found",
            ));
        }
        debug!(tokens = tokens.len(), "settings tokens extracted");
        Ok(self.signer.sign(&tokens)?)
    }

    /// Fetches the signed-in user's account record.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when any step fails or the response lacks user fields.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_current_user(&self) -> Result<UserRecord, SessionError> {
        let payload = self.signed_settings_payload().await?;
        let settings_url = self.config.api_url(SETTINGS_PATH);
        let response = self
            .transport
            .post_encoded(&settings_url, payload.body())
            .await?;
        if !response.is_ok() {
            return Err(SessionError::HttpStatus {
                url: settings_url,
                status: response.status,
            });
        }
        decode_user(SETTINGS_PATH, &response.body)
    }

    /// Lists all users visible to the session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] on transport failure, a non-200 status, or a
    /// body that is not a JSON array of users.
    #[instrument(level = "debug", skip(self))]
    pub async fn list_users(&self) -> Result<Vec<UserRecord>, SessionError> {
        let users_url = self.config.web_url(USERS_PATH);
        let response = self.transport.post_empty(&users_url).await?;
        if !response.is_ok() {
            return Err(SessionError::HttpStatus {
                url: users_url,
                status: response.status,
            });
        }
        let users = decode_users(USERS_PATH, &response.body)?;
        debug!(count = users.len(), "users fetched");
        Ok(users)
    }

    fn transition(&mut self, next: LoginPhase) {
        debug!(from = ?self.phase, to = ?next, "login phase");
        self.phase = next;
    }
}
