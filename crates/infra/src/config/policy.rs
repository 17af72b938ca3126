//! Conversion of configuration values into runtime settings

use std::time::Duration;

use outcall_common::auth::{CacheSettings, RefreshAhead};
use outcall_common::resilience::RetryConfig;
use outcall_domain::{CredentialRefreshProperties, OutcallError, Result, RetryProperties};

/// Retry engine settings for `props`.
///
/// # Errors
/// Returns `OutcallError::Config` if the delays are inverted.
pub fn retry_config(props: &RetryProperties) -> Result<RetryConfig> {
    RetryConfig::new(props.initial_delay(), props.max_delay(), props.max_attempts)
        .map_err(|e| OutcallError::Config(e.to_string()))
}

/// Credential cache settings for `props`.
///
/// # Errors
/// Returns `OutcallError::Config` if the retry delays are inverted.
pub fn cache_settings(props: &CredentialRefreshProperties) -> Result<CacheSettings> {
    let refresh_ahead = match props.refresh_ahead_secs {
        Some(secs) if secs > 0 => RefreshAhead::before_expiry(Duration::from_secs(secs)),
        _ => RefreshAhead::Never,
    };
    Ok(CacheSettings { retry: retry_config(&props.retry)?, refresh_ahead })
}

/// One-line summary of a retry policy, for logs.
#[must_use]
pub fn describe_retry(props: &RetryProperties) -> String {
    if props.max_attempts <= 1 {
        return "no retries".to_string();
    }
    format!(
        "{} attempts with delay changing from {}ms to {}ms",
        props.max_attempts, props.initial_delay_ms, props.max_delay_ms
    )
}
