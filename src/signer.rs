//! Signed payload construction for the protected account API.
//!
//! The remote verifier recomputes the `checkcode` from the other fields, so
//! the canonical string must be byte-identical:
//!
//! 1. add `timestamp` (Unix seconds) to the token map;
//! 2. sort keys by byte value;
//! 3. join `key=value` pairs with `&`, percent-encoding each value outside
//!    `A-Za-z0-9-_.~` (space becomes `%20`);
//! 4. `checkcode` = upper-case hex of HMAC-SHA1(secret, canonical string);
//! 5. payload = canonical string + `&checkcode=` + checkcode.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha1::Sha1;
use tracing::debug;

use crate::extract::TokenMap;

/// Key the signer adds for the signing time.
pub const TIMESTAMP_KEY: &str = "timestamp";
/// Key the signature is appended under.
pub const CHECKCODE_KEY: &str = "checkcode";

type HmacSha1 = Hmac<Sha1>;

/// Errors raised while signing a token map.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// A token uses a name the protocol reserves for itself.
    #[error("token key '{key}' is reserved by the signing protocol")]
    ReservedKey {
        /// The offending key.
        key: String,
    },

    /// The HMAC implementation refused the secret.
    #[error("signing secret rejected by HMAC")]
    InvalidSecret,
}

/// A signed request body. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    /// Sorted, percent-encoded `key=value&...` string including `timestamp`.
    pub canonical: String,
    /// Upper-case hex HMAC-SHA1 of `canonical`.
    pub checkcode: String,
    /// Unix time (seconds) embedded in `canonical`.
    pub timestamp: u64,
}

impl SignedPayload {
    /// Returns the form body to send: the canonical string with `checkcode` appended.
    #[must_use]
    pub fn body(&self) -> String {
        format!("{}&{CHECKCODE_KEY}={}", self.canonical, self.checkcode)
    }
}

/// Computes `checkcode` signatures with a shared secret.
#[derive(Clone)]
pub struct RequestSigner {
    secret: String,
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl RequestSigner {
    /// Creates a signer for `secret`.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Signs `tokens` with the current Unix time.
    ///
    /// Every call reads the clock again; nothing is cached.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::ReservedKey`] if `tokens` contains `timestamp` or `checkcode`.
    pub fn sign(&self, tokens: &TokenMap) -> Result<SignedPayload, SignError> {
        self.sign_at(tokens, unix_timestamp())
    }

    /// Signs `tokens` as if the current time were `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::ReservedKey`] if `tokens` contains `timestamp` or `checkcode`.
    pub fn sign_at(&self, tokens: &TokenMap, timestamp: u64) -> Result<SignedPayload, SignError> {
        if let Some(key) = [TIMESTAMP_KEY, CHECKCODE_KEY]
            .into_iter()
            .find(|reserved| tokens.contains_key(*reserved))
        {
            return Err(SignError::ReservedKey {
                key: key.to_string(),
            });
        }

        let timestamp_value = timestamp.to_string();
        let mut params: BTreeMap<&str, &str> = tokens
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        params.insert(TIMESTAMP_KEY, &timestamp_value);

        let canonical = canonical_string(&params);
        let checkcode = self.checkcode(&canonical)?;
        debug!(fields = params.len(), timestamp, "signed payload");

        Ok(SignedPayload {
            canonical,
            checkcode,
            timestamp,
        })
    }

    /// Returns the upper-case hex HMAC-SHA1 of `message`.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidSecret`] if the HMAC cannot be keyed.
    pub fn checkcode(&self, message: &str) -> Result<String, SignError> {
        let mut mac = <HmacSha1 as Mac>::new_from_slice(self.secret.as_bytes())
            .map_err(|_| SignError::InvalidSecret)?;
        mac.update(message.as_bytes());
        Ok(hex::encode_upper(mac.finalize().into_bytes()))
    }
}

/// Joins `params` (already in byte order) as `key=encoded_value&...`.
fn canonical_string(params: &BTreeMap<&str, &str>) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Current Unix time in whole seconds (0 if the clock is before the epoch).
pub(crate) fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}
