//! CLI entry point for the portal session tool.

use anyhow::{Result, bail};
use clap::Parser;
use portal_session_core::{CookieStore, Credentials, SessionError};
use tracing::{debug, info, warn};

mod app_config;
mod cli;
mod commands;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?cli, "CLI arguments parsed");

    let resolved = app_config::resolve_config(&cli)?;
    debug!(config = ?resolved.client, "configuration resolved");

    match cli.command {
        Some(Command::Logout) => {
            commands::run_logout_command(&CookieStore::new(resolved.client.session_file.clone()))
        }
        None => {
            let (Some(identifier), Some(secret)) =
                (cli.fetch.identifier.clone(), cli.fetch.secret.clone())
            else {
                bail!(
                    "Credentials required: pass --identifier/--secret or set PORTAL_IDENTIFIER/PORTAL_SECRET"
                );
            };

            info!("Portal session starting");
            let result = commands::run_fetch_command(
                resolved.client,
                Credentials::new(identifier, secret),
                &resolved.output,
                cli.fetch.fresh,
            )
            .await;

            if let Err(error) = &result
                && error
                    .downcast_ref::<SessionError>()
                    .is_some_and(SessionError::is_retryable)
            {
                warn!("The failure may be transient; re-run to retry the whole session flow");
            }
            result.map(|_| ())
        }
    }
}
