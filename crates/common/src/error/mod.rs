//! Common error types and classification
//!
//! Two pieces live here:
//!
//! 1. **`CommonError`**: recurring failure patterns (configuration, backend
//!    connectivity) that more specific errors compose with.
//! 2. **`ErrorClassification`**: the interface retry policies consult to
//!    decide whether another attempt makes sense.
//!
//! Module-specific errors embed `CommonError` rather than duplicating its
//! variants:
//!
//! ```rust,ignore
//! #[derive(Debug, Error)]
//! pub enum CredentialError {
//!     #[error("credential endpoint returned HTTP {status}")]
//!     Http { status: u16 },
//!
//!     #[error(transparent)]
//!     Common(#[from] CommonError),
//! }
//! ```

use std::fmt;

/// Recurring error patterns shared across modules
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// Configuration-related errors
    Config { message: String },

    /// Network or backend connectivity errors
    Backend { service: String, message: String, is_retryable: bool },
}

impl CommonError {
    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Backend failure that is worth retrying
    pub fn backend_retryable(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend { service: service.into(), message: message.into(), is_retryable: true }
    }

    /// Backend failure that will not go away on retry
    pub fn backend_permanent(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend { service: service.into(), message: message.into(), is_retryable: false }
    }
}

impl fmt::Display for CommonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { message } => write!(f, "Configuration error: {message}"),
            Self::Backend { service, message, .. } => {
                write!(f, "Backend '{service}' failed: {message}")
            }
        }
    }
}

impl std::error::Error for CommonError {}

/// Classification interface for errors
///
/// Retry policies and alerting use this to decide what to do with a failure
/// without knowing its concrete type.
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient: unreachable backends and temporary
    /// unavailability of the remote service.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;
}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Backend { is_retryable, .. } => *is_retryable,
            Self::Config { .. } => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Backend { is_retryable: true, .. } => ErrorSeverity::Warning,
            Self::Config { .. } | Self::Backend { .. } => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}
