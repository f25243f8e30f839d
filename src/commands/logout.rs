//! Logout command handler: delete the saved session snapshot.

use anyhow::{Result, anyhow};
use portal_session_core::CookieStore;
use tracing::info;

pub fn run_logout_command(store: &CookieStore) -> Result<()> {
    let removed = store
        .clear()
        .map_err(|error| anyhow!("Failed to clear saved session: {error}"))?;

    if removed {
        info!(path = %store.path().display(), "Cleared saved session");
    } else {
        info!("No saved session found");
    }

    Ok(())
}
