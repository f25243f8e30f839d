//! CLI command handlers.

mod fetch;
mod logout;

pub use fetch::run_fetch_command;
pub use logout::run_logout_command;
