//! Error types surfaced by [`super::SessionManager`].
//!
//! Each variant corresponds to one failure mode of the session flow so
//! callers can tell them apart without inspecting messages.

use thiserror::Error;

use super::StorageError;
use crate::extract::ExtractError;
use crate::signer::SignError;
use crate::transport::TransportError;

/// Longest response body kept on [`SessionError::LoginFailed`].
const MAX_DIAGNOSTIC_BODY: usize = 2048;

/// Errors that can occur while establishing or using a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Session snapshot could not be written.
    #[error("session storage failed: {0}")]
    Storage(#[from] StorageError),

    /// The login page did not contain the nonce field.
    #[error("nonce not found in login page {url}")]
    NonceNotFound {
        /// Login page URL.
        url: String,
    },

    /// The credentials POST did not answer with the expected redirect.
    #[error("login failed with HTTP {status}")]
    LoginFailed {
        /// The HTTP status code.
        status: u16,
        /// Response body (truncated) for diagnostics.
        body: String,
    },

    /// Transport failure on any call.
    #[error(transparent)]
    Network(#[from] TransportError),

    /// A page or endpoint answered with an unexpected status.
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// A protected endpoint returned unexpected or missing fields.
    #[error("unexpected data from {endpoint}: {reason}")]
    UpstreamData {
        /// Endpoint path.
        endpoint: String,
        /// Description of what was wrong.
        reason: String,
    },

    /// HTML extraction could not run.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// The extracted tokens could not be signed.
    #[error("failed to sign request: {0}")]
    Signing(#[from] SignError),
}

impl SessionError {
    /// Creates a login failure, truncating `body` to a diagnostic-sized prefix.
    pub(crate) fn login_failed(status: u16, body: &str) -> Self {
        let body = match body.char_indices().nth(MAX_DIAGNOSTIC_BODY) {
            Some((cut, _)) => format!("{}…", &body[..cut]),
            None => body.to_string(),
        };
        Self::LoginFailed { status, body }
    }

    /// Creates an upstream data error.
    pub(crate) fn upstream(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UpstreamData {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` when re-running the whole login flow might succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::NonceNotFound { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 401,
            _ => false,
        }
    }
}
