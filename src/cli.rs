//! CLI argument definitions using clap derive macros.

use std::fmt;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Log in to the portal, keep the session between runs, and export account data.
///
/// Without a subcommand, ensures a session (reusing the saved one when the
/// server still accepts it), then writes the users list followed by the
/// signed-in user to the output file.
#[derive(Parser, Debug)]
#[command(name = "portal-session")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Session snapshot file (default: ~/.config/portal-session/session.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub session_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub fetch: FetchArgs,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Delete the saved session snapshot
    Logout,
}

/// Options for the default fetch run.
#[derive(Args, Clone)]
pub struct FetchArgs {
    /// Login identifier (email / username)
    #[arg(long, env = "PORTAL_IDENTIFIER")]
    pub identifier: Option<String>,

    /// Login password
    #[arg(long, env = "PORTAL_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// Output JSON file (default: users.json)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Ignore the saved session and log in again
    #[arg(long)]
    pub fresh: bool,

    /// Web host base URL
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// API host base URL
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Connect timeout in seconds (1-3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: Option<u64>,

    /// Whole-request timeout in seconds (1-3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: Option<u64>,
}

// Custom Debug impl that redacts the password.
impl fmt::Debug for FetchArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchArgs")
            .field("identifier", &self.identifier)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("output", &self.output)
            .field("fresh", &self.fresh)
            .field("base_url", &self.base_url)
            .field("api_url", &self.api_url)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}
