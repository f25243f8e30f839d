//! Authentication and session management.
//!
//! This module owns the session lifecycle: the in-memory cookie jar shared with
//! the HTTP client, persisted session snapshots, and the nonce-based login flow.

mod cookies;
mod error;
mod manager;
mod session;
mod storage;

pub use cookies::{CookieError, CookieRecord, SessionJar, parse_set_cookie};
pub use error::SessionError;
pub use manager::{LoginPhase, SessionManager};
pub use session::{Credentials, Session, SessionState};
pub use storage::{CookieStore, StorageError, default_config_dir, default_session_path};
