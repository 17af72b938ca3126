//! Configuration structures
//!
//! Durations are stored as plain integers (milliseconds or seconds, as the
//! field name says) so the same structs deserialize from TOML, JSON and
//! environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{OutcallError, Result};

/// Retry settings for one retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryProperties {
    /// Delay before the first retry (default: 100 ms)
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay (default: 1000 ms)
    pub max_delay_ms: u64,

    /// Total attempts including the first one; 0 and 1 disable retries
    /// (default: 5)
    pub max_attempts: u32,
}

impl Default for RetryProperties {
    fn default() -> Self {
        Self { initial_delay_ms: 100, max_delay_ms: 1000, max_attempts: 5 }
    }
}

impl RetryProperties {
    /// Delay before the first retry.
    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Upper bound for any single delay.
    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Validate the settings.
    ///
    /// # Errors
    /// Returns `OutcallError::Config` if `max_delay_ms` is lower than
    /// `initial_delay_ms`.
    pub fn validate(&self) -> Result<()> {
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(OutcallError::Config(format!(
                "max_delay_ms ({}) must not be lower than initial_delay_ms ({})",
                self.max_delay_ms, self.initial_delay_ms
            )));
        }
        Ok(())
    }
}

/// Settings for the credential refresh cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialRefreshProperties {
    /// Retry policy used when obtaining a fresh credential
    pub retry: RetryProperties,

    /// Refresh this many seconds before expiry; `None` disables
    /// pre-emptive refresh
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_ahead_secs: Option<u64>,
}

impl Default for CredentialRefreshProperties {
    fn default() -> Self {
        Self {
            retry: RetryProperties { initial_delay_ms: 500, max_delay_ms: 2000, max_attempts: 3 },
            refresh_ahead_secs: Some(60),
        }
    }
}

/// Top-level client configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Retry policy for outbound calls
    pub retry: RetryProperties,

    /// Credential refresh settings
    pub credential_refresh: CredentialRefreshProperties,
}

impl ClientConfig {
    /// Validate every nested retry policy.
    ///
    /// # Errors
    /// Returns the first validation error found.
    pub fn validate(&self) -> Result<()> {
        self.retry.validate()?;
        self.credential_refresh.retry.validate()
    }
}
