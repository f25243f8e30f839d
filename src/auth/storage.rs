//! Session snapshot persistence.
//!
//! A snapshot is a JSON array of cookie records written to:
//! `~/.config/portal-session/session.json` (or `$XDG_CONFIG_HOME/portal-session/session.json`)
//! unless an explicit path is configured.

use std::env;
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use super::{CookieRecord, Session};

const APP_DIR_NAME: &str = "portal-session";
const SESSION_FILE_NAME: &str = "session.json";

/// Errors for persisted session storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No suitable user config directory is available.
    #[error("unable to determine config directory (set XDG_CONFIG_HOME or HOME)")]
    ConfigDirUnavailable,
    /// Filesystem I/O failed.
    #[error("session file {path}: {source}")]
    Io {
        /// File the operation targeted.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Serialization/deserialization failed.
    #[error("session file {path} is not a valid snapshot: {source}")]
    Json {
        /// File the operation targeted.
        path: PathBuf,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StoredCookie {
    domain: String,
    #[serde(default = "default_host_only")]
    host_only: bool,
    path: String,
    #[serde(default)]
    secure: bool,
    #[serde(default)]
    http_only: bool,
    #[serde(default, alias = "expiry")]
    expires: u64,
    name: String,
    value: String,
}

// Records without the flag are scoped like `CookieRecord::new`: host only.
fn default_host_only() -> bool {
    true
}

impl StoredCookie {
    fn from_record(cookie: &CookieRecord) -> Self {
        Self {
            domain: cookie.domain.clone(),
            host_only: cookie.host_only,
            path: cookie.path.clone(),
            secure: cookie.secure,
            http_only: cookie.http_only,
            expires: cookie.expires,
            name: cookie.name.clone(),
            value: cookie.value().to_string(),
        }
    }

    fn into_record(self) -> CookieRecord {
        let mut record = CookieRecord::new(self.domain, self.path, self.name, self.value);
        record.host_only = self.host_only;
        record.secure = self.secure;
        record.http_only = self.http_only;
        record.expires = self.expires;
        record
    }
}

/// Durable storage for one session snapshot.
///
/// The store only serializes what [`Session::snapshot`] hands it and builds a
/// fresh [`Session`] on load; it never mutates a live session. Concurrent
/// writers to the same file are not supported: give each session its own path.
#[derive(Debug, Clone)]
pub struct CookieStore {
    path: PathBuf,
}

impl CookieStore {
    /// Creates a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the snapshot file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the session's current cookies to disk, replacing any previous snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when serialization or file writing fails.
    pub fn save(&self, session: &Session) -> Result<(), StorageError> {
        self.save_records(&session.snapshot())
    }

    /// Writes `cookies` to disk, replacing any previous snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when serialization or file writing fails.
    #[instrument(level = "debug", skip(self, cookies), fields(path = %self.path.display()))]
    pub fn save_records(&self, cookies: &[CookieRecord]) -> Result<(), StorageError> {
        let stored = cookies
            .iter()
            .map(StoredCookie::from_record)
            .collect::<Vec<_>>();
        let payload = serde_json::to_vec_pretty(&stored).map_err(|source| StorageError::Json {
            path: self.path.clone(),
            source,
        })?;
        write_snapshot(&self.path, &payload).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(cookies = stored.len(), "session snapshot written");
        Ok(())
    }

    /// Reads the snapshot from disk.
    ///
    /// Returns `Ok(None)` when no snapshot file exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the file cannot be read or is not a valid snapshot.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub fn try_load(&self) -> Result<Option<Vec<CookieRecord>>, StorageError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let stored =
            serde_json::from_slice::<Vec<StoredCookie>>(&bytes).map_err(|source| {
                StorageError::Json {
                    path: self.path.clone(),
                    source,
                }
            })?;
        Ok(Some(
            stored.into_iter().map(StoredCookie::into_record).collect(),
        ))
    }

    /// Restores a session from disk.
    ///
    /// A missing, unreadable or corrupt file all yield `None`: callers treat
    /// that the same as "no prior session". Failures other than a missing file
    /// are logged.
    #[must_use]
    pub fn load(&self) -> Option<Session> {
        match self.try_load() {
            Ok(Some(cookies)) => {
                info!(
                    cookies = cookies.len(),
                    path = %self.path.display(),
                    "Loaded saved session cookies"
                );
                Some(Session::restored(cookies))
            }
            Ok(None) => {
                info!("No previous session found");
                None
            }
            Err(error) => {
                warn!(
                    error = %error,
                    "Failed to load saved session; continuing without stored cookies"
                );
                None
            }
        }
    }

    /// Removes the snapshot file.
    ///
    /// Returns `true` when the file existed and was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when file removal fails.
    pub fn clear(&self) -> Result<bool, StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StorageError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Returns the default snapshot path (`~/.config/portal-session/session.json`).
///
/// # Errors
///
/// Returns [`StorageError::ConfigDirUnavailable`] if no usable config dir is found.
pub fn default_session_path() -> Result<PathBuf, StorageError> {
    Ok(default_config_dir()?.join(SESSION_FILE_NAME))
}

/// Returns the per-user configuration directory for this tool.
///
/// # Errors
///
/// Returns [`StorageError::ConfigDirUnavailable`] if no usable config dir is found.
pub fn default_config_dir() -> Result<PathBuf, StorageError> {
    resolve_config_dir(
        sanitize_env_path(env::var_os("XDG_CONFIG_HOME")),
        sanitize_env_path(env::var_os("HOME")),
        sanitize_env_path(env::var_os("APPDATA")),
    )
}

fn sanitize_env_path(value: Option<OsString>) -> Option<PathBuf> {
    let value = value?;
    if value.to_string_lossy().trim().is_empty() {
        return None;
    }

    Some(PathBuf::from(value))
}

fn resolve_config_dir(
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
    app_data: Option<PathBuf>,
) -> Result<PathBuf, StorageError> {
    if let Some(xdg) = xdg_config_home {
        return Ok(xdg.join(APP_DIR_NAME));
    }
    if let Some(home) = home {
        return Ok(home.join(".config").join(APP_DIR_NAME));
    }
    if let Some(app_data) = app_data {
        return Ok(app_data.join(APP_DIR_NAME));
    }

    Err(StorageError::ConfigDirUnavailable)
}

fn write_snapshot(path: &Path, payload: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    // Owner-only from the first byte; renamed into place once complete.
    let temp = temp_path(path);
    match fs::remove_file(&temp) {
        Err(error) if error.kind() != io::ErrorKind::NotFound => return Err(error),
        _ => {}
    }

    let written = owner_only_options()
        .open(&temp)
        .and_then(|mut file| {
            file.write_all(payload)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&temp, path));
    if written.is_err() {
        let _ = fs::remove_file(&temp);
    }
    written
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from(SESSION_FILE_NAME), OsString::from);
    name.push(".tmp");
    path.with_file_name(name)
}

fn owner_only_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options
}
