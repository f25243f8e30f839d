//! Fetch command handler: ensure a session, then export users and the
//! signed-in account to a JSON file.

use std::path::Path;

use anyhow::{Context, Result};
use portal_session_core::{ClientConfig, Credentials, SessionManager, UserRecord};
use tracing::info;

/// Runs the default command. Returns the number of records written.
pub async fn run_fetch_command(
    config: ClientConfig,
    credentials: Credentials,
    output: &Path,
    fresh: bool,
) -> Result<usize> {
    let mut manager = SessionManager::new(config, credentials)?;
    if fresh {
        info!("Ignoring saved session (--fresh)");
        manager = manager.without_restore();
    }

    manager
        .ensure_session()
        .await
        .context("Could not establish an authenticated session")?;

    let mut records = manager
        .list_users()
        .await
        .context("Failed to fetch users")?;
    info!(count = records.len(), "Fetched users");

    let current = manager
        .fetch_current_user()
        .await
        .context("Failed to fetch current user")?;
    info!(id = %current.id, "Fetched current user");
    records.push(current);

    write_records(output, &records).await?;
    info!(path = %output.display(), records = records.len(), "Wrote account data");
    Ok(records.len())
}

async fn write_records(output: &Path, records: &[UserRecord]) -> Result<()> {
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
    }
    let json = serde_json::to_vec_pretty(records)?;
    tokio::fs::write(output, json)
        .await
        .with_context(|| format!("Cannot write '{}'", output.display()))
}
