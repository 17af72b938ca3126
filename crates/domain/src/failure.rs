//! Typed domain failures
//!
//! A [`DomainFailure`] is the only failure type callers of a remote client
//! ever see. It carries a [`FailureKind`] (the HTTP status family it maps
//! to), an optional business code reported by the remote party, a message,
//! and optionally the error it was derived from.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Shared, type-erased cause attached to a failure.
pub type SharedCause = Arc<dyn StdError + Send + Sync + 'static>;

/// Classification of a domain failure by the HTTP status it represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// 400
    BadRequest,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 405
    MethodNotAllowed,
    /// 409
    Conflict,
    /// 422
    UnprocessableEntity,
    /// 429
    TooManyRequests,
    /// 500
    Internal,
    /// 501
    NotImplemented,
    /// 502
    BadGateway,
    /// 503
    ServiceUnavailable,
    /// 504, also used when no response was received at all
    ServiceTimeout,
    /// Any other status code
    Other(u16),
}

impl FailureKind {
    /// Map an HTTP status code to its failure kind.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            405 => Self::MethodNotAllowed,
            409 => Self::Conflict,
            422 => Self::UnprocessableEntity,
            429 => Self::TooManyRequests,
            500 => Self::Internal,
            501 => Self::NotImplemented,
            502 => Self::BadGateway,
            503 => Self::ServiceUnavailable,
            504 => Self::ServiceTimeout,
            other => Self::Other(other),
        }
    }

    /// HTTP status code this kind stands for.
    #[must_use]
    pub const fn status(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::Conflict => 409,
            Self::UnprocessableEntity => 422,
            Self::TooManyRequests => 429,
            Self::Internal => 500,
            Self::NotImplemented => 501,
            Self::BadGateway => 502,
            Self::ServiceUnavailable => 503,
            Self::ServiceTimeout => 504,
            Self::Other(status) => status,
        }
    }

    /// Returns true for kinds in the 5xx range.
    #[must_use]
    pub const fn is_server_error(self) -> bool {
        matches!(self.status(), 500..=599)
    }

    /// Returns true for kinds in the 4xx range.
    #[must_use]
    pub const fn is_client_error(self) -> bool {
        matches!(self.status(), 400..=499)
    }

    const fn reason(self) -> &'static str {
        match self {
            Self::BadRequest => "bad request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not found",
            Self::MethodNotAllowed => "method not allowed",
            Self::Conflict => "conflict",
            Self::UnprocessableEntity => "unprocessable entity",
            Self::TooManyRequests => "too many requests",
            Self::Internal => "internal error",
            Self::NotImplemented => "not implemented",
            Self::BadGateway => "bad gateway",
            Self::ServiceUnavailable => "service unavailable",
            Self::ServiceTimeout => "service timeout",
            Self::Other(_) => "unexpected status",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status(), self.reason())
    }
}

/// Application-level failure produced by the resilience layer.
///
/// Equality compares kind, code and message; the cause is ignored.
#[derive(Clone)]
pub struct DomainFailure {
    kind: FailureKind,
    code: Option<String>,
    message: String,
    cause: Option<SharedCause>,
}

impl DomainFailure {
    /// Create a failure of the given kind with a message.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self { kind, code: None, message: message.into(), cause: None }
    }

    /// Create a failure for a status code using the kind's canonical
    /// message.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        let kind = FailureKind::from_status(status);
        Self::new(kind, kind.reason())
    }

    /// Failure used when the remote party could not be reached.
    pub fn service_timeout(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ServiceTimeout, message)
    }

    /// Attach a business code reported by the remote party.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach the error this failure was derived from.
    #[must_use]
    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// Attach an already shared cause.
    #[must_use]
    pub fn with_shared_cause(mut self, cause: SharedCause) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Failure kind.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        self.kind
    }

    /// HTTP status of the failure kind.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.kind.status()
    }

    /// Business code, if the remote party reported one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Human readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Shared handle to the cause, if any.
    #[must_use]
    pub const fn cause(&self) -> Option<&SharedCause> {
        self.cause.as_ref()
    }
}

impl fmt::Debug for DomainFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainFailure")
            .field("kind", &self.kind)
            .field("code", &self.code)
            .field("message", &self.message)
            .field("cause", &self.cause.as_ref().map(ToString::to_string))
            .finish()
    }
}

impl fmt::Display for DomainFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} [{}]: {}", self.kind, code, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl StdError for DomainFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn StdError + 'static))
    }
}

impl PartialEq for DomainFailure {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.code == other.code && self.message == other.message
    }
}

impl Eq for DomainFailure {}
