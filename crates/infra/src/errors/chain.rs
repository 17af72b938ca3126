//! Transport and status failures, and the retryable wrapper around them.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use outcall_domain::failure::SharedCause;
use outcall_domain::DomainFailure;
use reqwest::Method;

/// Failure reported by the transport for one request.
///
/// Either no response was received at all (`status()` is `None`), or the
/// remote party answered with a non-success status and possibly a body.
#[derive(Debug, Clone)]
pub struct TransportError {
    status: Option<u16>,
    method: Method,
    url: String,
    body: Vec<u8>,
    message: String,
    source: Option<SharedCause>,
}

impl TransportError {
    /// The request never reached the remote party, or the connection broke
    /// before a response was read.
    pub fn no_response(
        method: Method,
        url: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            status: None,
            method,
            url: url.into(),
            body: Vec::new(),
            message: source.to_string(),
            source: Some(Arc::new(source)),
        }
    }

    /// The remote party answered with `status`.
    pub fn responded(
        status: u16,
        method: Method,
        url: impl Into<String>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            status: Some(status),
            method,
            url: url.into(),
            body: body.into(),
            message: format!("remote party answered HTTP {status}"),
            source: None,
        }
    }

    /// Status the remote party answered with, `None` when no response was
    /// received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    /// Method of the failed request
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// URL of the failed request
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Raw response body, `None` when empty or when no response was
    /// received.
    #[must_use]
    pub fn body(&self) -> Option<&[u8]> {
        (!self.body.is_empty()).then_some(self.body.as_slice())
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} {} failed with HTTP {status}", self.method, self.url),
            None => write!(
                f,
                "{} {} failed before a response was received: {}",
                self.method, self.url, self.message
            ),
        }
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|cause| cause as &(dyn StdError + 'static))
    }
}

/// Marks a failed attempt the remote client should try again.
///
/// The wrapped [`DomainFailure`] is what callers receive once attempts are
/// exhausted.
#[derive(Debug, Clone)]
pub struct RetryableFailure {
    status: u16,
    method: Method,
    retry_after: Option<Duration>,
    cause: DomainFailure,
}

impl RetryableFailure {
    /// Wrap `cause` with the normalized status and request method.
    #[must_use]
    pub const fn new(status: u16, method: Method, cause: DomainFailure) -> Self {
        Self { status, method, retry_after: None, cause }
    }

    /// Record the delay the remote party asked for.
    #[must_use]
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// Normalized status
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Delay requested through `Retry-After`, if any
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Failure reported if no further attempt succeeds
    #[must_use]
    pub const fn domain_failure(&self) -> &DomainFailure {
        &self.cause
    }

    #[must_use]
    pub fn into_domain_failure(self) -> DomainFailure {
        self.cause
    }
}

impl fmt::Display for RetryableFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "retryable {} failure (HTTP {}): {}", self.method, self.status, self.cause)
    }
}

impl StdError for RetryableFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.cause)
    }
}

/// Plain error carrying an HTTP status, for callers that wrap status codes
/// without a full transport context.
#[derive(Debug, Clone)]
pub struct StatusError {
    status: u16,
    message: String,
    source: Option<SharedCause>,
}

impl StatusError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), source: None }
    }

    /// Attach the error this status was derived from.
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}: {}", self.status, self.message)
    }
}

impl StdError for StatusError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|cause| cause as &(dyn StdError + 'static))
    }
}
