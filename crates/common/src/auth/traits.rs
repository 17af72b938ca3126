//! Collaborator traits for the credential cache
//!
//! These traits enable dependency injection and testing by abstracting the
//! credential issuer and the alerting channel.

use std::fmt;

use async_trait::async_trait;
use tracing::error;

use super::types::{Credential, CredentialError};
use crate::error::{ErrorClassification, ErrorSeverity};

/// Producer of fresh credentials
///
/// Implemented once per header type: an OAuth client-credentials exchange,
/// a static API key, a signed token minted locally, and so on.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Obtain a new credential
    ///
    /// # Returns
    /// `Ok(None)` when the source has nothing to offer right now.
    ///
    /// # Errors
    /// Returns `CredentialError` when the issuer could not be reached or
    /// answered with garbage. The cache retries errors that classify as
    /// retryable.
    async fn obtain_fresh_credential(&self) -> Result<Option<Credential>, CredentialError>;
}

/// Why a credential load produced nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshFailureReason {
    /// Every attempt failed; carries the last error
    Exhausted(CredentialError),
    /// The source failed with an error that retrying cannot fix
    NonRetryable(CredentialError),
    /// The source answered without a credential
    Empty,
}

/// Alert payload raised when a credential load comes back empty-handed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRefreshFailure {
    pub header_name: String,
    pub attempts: u32,
    pub reason: RefreshFailureReason,
}

impl CredentialRefreshFailure {
    /// Severity of the underlying error; an empty answer is a warning
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        match &self.reason {
            RefreshFailureReason::Exhausted(err) | RefreshFailureReason::NonRetryable(err) => {
                err.severity()
            }
            RefreshFailureReason::Empty => ErrorSeverity::Warning,
        }
    }
}

impl fmt::Display for CredentialRefreshFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            RefreshFailureReason::Exhausted(err) => write!(
                f,
                "failed to refresh '{}' after {} attempts: {err}",
                self.header_name, self.attempts
            ),
            RefreshFailureReason::NonRetryable(err) => {
                write!(f, "failed to refresh '{}': {err}", self.header_name)
            }
            RefreshFailureReason::Empty => {
                write!(f, "credential source for '{}' returned no credential", self.header_name)
            }
        }
    }
}

impl std::error::Error for CredentialRefreshFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.reason {
            RefreshFailureReason::Exhausted(err) | RefreshFailureReason::NonRetryable(err) => {
                Some(err)
            }
            RefreshFailureReason::Empty => None,
        }
    }
}

/// Fire-and-forget alert channel
pub trait AlertSink: Send + Sync {
    /// Report a failed credential load. Must not block.
    fn send_alert(&self, failure: &CredentialRefreshFailure);
}

/// Alert sink that only writes an error event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn send_alert(&self, failure: &CredentialRefreshFailure) {
        error!(
            header = %failure.header_name,
            attempts = failure.attempts,
            severity = %failure.severity(),
            "ALERT: {failure}"
        );
    }
}
