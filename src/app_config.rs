//! Application configuration loading and merging for the CLI.
//!
//! Precedence: CLI flag > `config.toml` value > built-in default.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use portal_session_core::ClientConfig;
use portal_session_core::auth::default_config_dir;

use crate::cli::Cli;

const CONFIG_FILE_NAME: &str = "config.toml";
const DEFAULT_OUTPUT_FILE: &str = "users.json";

/// TOML-style file configuration for CLI defaults.
#[derive(Debug, Clone, Default)]
pub struct FileConfig {
    /// Web host base URL.
    pub base_url: Option<String>,
    /// API host base URL.
    pub api_base_url: Option<String>,
    /// Session snapshot path.
    pub session_file: Option<PathBuf>,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// Whole-request timeout in seconds.
    pub read_timeout_secs: Option<u64>,
    /// Shared HMAC secret override.
    pub signing_secret: Option<String>,
    /// Default output file.
    pub output: Option<PathBuf>,
}

impl FileConfig {
    /// Validates config values against CLI constraints.
    pub fn validate(&self) -> Result<()> {
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        for (field, value) in [
            ("base_url", &self.base_url),
            ("api_base_url", &self.api_base_url),
        ] {
            if let Some(url) = value
                && url::Url::parse(url).is_err()
            {
                bail!("Invalid config value for `{field}`: '{url}' is not an absolute URL");
            }
        }
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Settings resolved from every source, ready for the commands.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Library client configuration.
    pub client: ClientConfig,
    /// Output file for the fetch command.
    pub output: PathBuf,
}

/// Resolves the default config path (`$XDG_CONFIG_HOME/portal-session/config.toml`
/// or `$HOME/.config/portal-session/config.toml`).
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    default_config_dir()
        .ok()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Loads the default config file, if present, and merges it with CLI flags.
pub fn resolve_config(cli: &Cli) -> Result<ResolvedConfig> {
    let file_config = match resolve_default_config_path() {
        Some(path) if path.exists() => Some(load_file_config(&path)?),
        _ => None,
    };
    Ok(merge_config(cli, file_config.unwrap_or_default()))
}

fn merge_config(cli: &Cli, file: FileConfig) -> ResolvedConfig {
    let mut client = ClientConfig::default();
    let args = &cli.fetch;

    if let Some(base_url) = args.base_url.clone().or(file.base_url) {
        client.base_url = base_url;
    }
    if let Some(api_base_url) = args.api_url.clone().or(file.api_base_url) {
        client.api_base_url = api_base_url;
    }
    if let Some(session_file) = cli.session_file.clone().or(file.session_file) {
        client.session_file = session_file;
    }
    if let Some(secs) = args.connect_timeout.or(file.connect_timeout_secs) {
        client.connect_timeout_secs = secs;
    }
    if let Some(secs) = args.read_timeout.or(file.read_timeout_secs) {
        client.read_timeout_secs = secs;
    }
    if let Some(secret) = file.signing_secret {
        client.signing_secret = secret;
    }

    let output = args
        .output
        .clone()
        .or(file.output)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE));

    ResolvedConfig { client, output }
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_number = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_number}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {line_number}");

        match key {
            "base_url" => cfg.base_url = Some(parse_string_literal(value).with_context(invalid)?),
            "api_base_url" => {
                cfg.api_base_url = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "session_file" => {
                cfg.session_file = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "output" => {
                cfg.output = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "signing_secret" => {
                cfg.signing_secret = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}
