//! Portal Session Core Library
//!
//! Authenticates against a cookie-session web portal protected by a one-time
//! login nonce, keeps the resulting session on disk between runs, and builds
//! HMAC-signed requests for the portal's protected account API.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`auth`] - Session model, cookie jar, persisted snapshots and the login state machine
//! - [`extract`] - Hidden-field and nonce extraction from fetched HTML
//! - [`signer`] - Canonical payload construction and `checkcode` signing
//! - [`transport`] - reqwest-backed HTTP transport sharing the session cookie jar
//! - [`account`] - JSON models returned by the protected endpoints
//! - [`config`] - Endpoint, timeout and storage configuration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod account;
pub mod auth;
pub mod config;
pub mod extract;
pub mod signer;
pub mod transport;
mod user_agent;

// Re-export commonly used types
pub use account::UserRecord;
pub use auth::{
    CookieRecord, CookieStore, Credentials, LoginPhase, Session, SessionError, SessionJar,
    SessionManager, SessionState, StorageError, default_session_path,
};
pub use config::{ClientConfig, DEFAULT_SIGNING_SECRET};
pub use extract::{ExtractError, TokenMap, extract_nonce, extract_tokens};
pub use signer::{RequestSigner, SignError, SignedPayload};
pub use transport::{HttpTransport, TransportError, TransportResponse};
