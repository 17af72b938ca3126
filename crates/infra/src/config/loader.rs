//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the required variables are missing, falls back to a file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Every successfully loaded configuration is validated, and the effective
//! retry policies are logged.
//!
//! ## Environment Variables
//! - `OUTCALL_RETRY_INITIAL_DELAY_MS`: Delay before the first retry (required)
//! - `OUTCALL_RETRY_MAX_DELAY_MS`: Upper bound for any delay (required)
//! - `OUTCALL_RETRY_MAX_ATTEMPTS`: Total attempts per call (required)
//! - `OUTCALL_REFRESH_RETRY_INITIAL_DELAY_MS`: Credential refresh retries
//! - `OUTCALL_REFRESH_RETRY_MAX_DELAY_MS`: Credential refresh retries
//! - `OUTCALL_REFRESH_RETRY_MAX_ATTEMPTS`: Credential refresh retries
//! - `OUTCALL_REFRESH_AHEAD_SECS`: Lead time before expiry; `0`, `off` or
//!   `none` disables pre-emptive refresh
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./outcall.toml` or `./outcall.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names in the parent and grandparent directories
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use outcall_domain::{ClientConfig, CredentialRefreshProperties, OutcallError, Result, RetryProperties};

use super::policy::describe_retry;

const FILE_NAMES: [&str; 4] = ["outcall.toml", "outcall.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variable is missing or invalid, falls back to loading from a config file.
///
/// # Errors
/// Returns `OutcallError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The loaded retry policies are inconsistent
pub fn load() -> Result<ClientConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// The three `OUTCALL_RETRY_*` variables are required. Credential refresh
/// variables are optional and default individually.
///
/// # Errors
/// Returns `OutcallError::Config` if required variables are missing or
/// any variable has an invalid value.
pub fn load_from_env() -> Result<ClientConfig> {
    let retry = RetryProperties {
        initial_delay_ms: env_parse(&env_var("OUTCALL_RETRY_INITIAL_DELAY_MS")?, "initial delay")?,
        max_delay_ms: env_parse(&env_var("OUTCALL_RETRY_MAX_DELAY_MS")?, "max delay")?,
        max_attempts: env_parse(&env_var("OUTCALL_RETRY_MAX_ATTEMPTS")?, "max attempts")?,
    };

    let defaults = CredentialRefreshProperties::default();
    let credential_refresh = CredentialRefreshProperties {
        retry: RetryProperties {
            initial_delay_ms: env_opt("OUTCALL_REFRESH_RETRY_INITIAL_DELAY_MS", "refresh initial delay")?
                .unwrap_or(defaults.retry.initial_delay_ms),
            max_delay_ms: env_opt("OUTCALL_REFRESH_RETRY_MAX_DELAY_MS", "refresh max delay")?
                .unwrap_or(defaults.retry.max_delay_ms),
            max_attempts: env_opt("OUTCALL_REFRESH_RETRY_MAX_ATTEMPTS", "refresh max attempts")?
                .unwrap_or(defaults.retry.max_attempts),
        },
        refresh_ahead_secs: env_refresh_ahead("OUTCALL_REFRESH_AHEAD_SECS")?
            .unwrap_or(defaults.refresh_ahead_secs),
    };

    finish(ClientConfig { retry, credential_refresh })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
/// Missing sections and fields take their defaults.
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `OutcallError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - The loaded retry policies are inconsistent
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(OutcallError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            OutcallError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| OutcallError::Config(format!("Failed to read config file: {e}")))?;

    finish(parse_config(&contents, &config_path)?)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `OutcallError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| OutcallError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| OutcallError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(OutcallError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Validate and log the effective retry policies
fn finish(config: ClientConfig) -> Result<ClientConfig> {
    config.validate()?;
    tracing::info!(
        retry = %describe_retry(&config.retry),
        credential_refresh = %describe_retry(&config.credential_refresh.retry),
        refresh_ahead_secs = ?config.credential_refresh.refresh_ahead_secs,
        "Effective retry policy"
    );
    Ok(config)
}

/// Probe multiple paths for configuration files
///
/// Searches for config files in the following locations (in order):
/// 1. Current working directory and up to two parents
/// 2. Executable directory and up to two parents
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| [root.clone(), root.join(".."), root.join("../..")])
        .flat_map(|dir| FILE_NAMES.map(|name| dir.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `OutcallError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| OutcallError::Config(format!("Missing required environment variable: {key}")))
}

fn env_parse<T>(value: &str, what: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| OutcallError::Config(format!("Invalid {what}: {e}")))
}

/// Optional variable, parsed when set
fn env_opt<T>(key: &str, what: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(key).ok().map(|value| env_parse(&value, what)).transpose()
}

/// Refresh-ahead lead time
///
/// Returns `None` when unset, `Some(None)` when disabled.
fn env_refresh_ahead(key: &str) -> Result<Option<Option<u64>>> {
    let Ok(value) = std::env::var(key) else {
        return Ok(None);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "off" | "none" | "0" => Ok(Some(None)),
        other => env_parse(other, "refresh ahead").map(|secs| Some(Some(secs))),
    }
}
