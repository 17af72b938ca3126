//! Mapping of structured remote error bodies to domain failures

use std::collections::HashMap;

use outcall_domain::{DomainFailure, ErrorPayload, FailureKind};

/// Business code reported when a user lookup found nothing.
pub const USER_NOT_FOUND: &str = "USER_NOT_FOUND";

/// Maps a parsed error body to a domain failure, `None` when the body is
/// not understood.
pub trait PayloadMapper: Send + Sync {
    fn map(&self, payload: &ErrorPayload) -> Option<DomainFailure>;
}

impl<F> PayloadMapper for F
where
    F: Fn(&ErrorPayload) -> Option<DomainFailure> + Send + Sync,
{
    fn map(&self, payload: &ErrorPayload) -> Option<DomainFailure> {
        self(payload)
    }
}

/// Table of known business codes.
///
/// Registered codes map to their kind. Unregistered codes fall back to the
/// status inside the payload, if any. The failure keeps the code and the
/// payload's message.
#[derive(Debug, Clone, Default)]
pub struct CodeRegistry {
    codes: HashMap<String, FailureKind>,
}

impl CodeRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the codes shared by every service.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new().register(USER_NOT_FOUND, FailureKind::NotFound)
    }

    /// Register `code` as `kind`, replacing an earlier registration.
    #[must_use]
    pub fn register(mut self, code: impl Into<String>, kind: FailureKind) -> Self {
        self.codes.insert(code.into(), kind);
        self
    }

    #[must_use]
    pub fn kind_for(&self, code: &str) -> Option<FailureKind> {
        self.codes.get(code).copied()
    }
}

impl PayloadMapper for CodeRegistry {
    fn map(&self, payload: &ErrorPayload) -> Option<DomainFailure> {
        let kind = self
            .kind_for(&payload.code)
            .or_else(|| payload.status.map(FailureKind::from_status))?;
        let message = payload.message.clone().unwrap_or_else(|| payload.code.clone());
        Some(DomainFailure::new(kind, message).with_code(payload.code.clone()))
    }
}
