//! Exception chain classification
//!
//! [`FailedRemoteCallParser::parse`] turns any error into a
//! [`FailedRemoteCall`] record. The record always exists: when no rule
//! matches, only the original error is set.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use outcall_domain::failure::SharedCause;
use outcall_domain::{DomainFailure, ErrorPayload, FailureKind};
use tracing::{debug, trace};

use super::registry::{CodeRegistry, PayloadMapper};
use super::status::{DefaultStatusMapper, StatusMapper, StatusResolver, GATEWAY_TIMEOUT};
use crate::errors::TransportError;

type Link<'a> = &'a (dyn StdError + 'static);

/// Rule deriving a local failure from one chain link.
type LocalRule = fn(&FailedRemoteCallParser, Link<'_>) -> Option<DomainFailure>;

/// Most specific first.
const LOCAL_RULES: [LocalRule; 3] = [domain_passthrough, connectivity_failure, status_failure];

fn domain_passthrough(_: &FailedRemoteCallParser, link: Link<'_>) -> Option<DomainFailure> {
    link.downcast_ref::<DomainFailure>().cloned()
}

fn connectivity_failure(parser: &FailedRemoteCallParser, link: Link<'_>) -> Option<DomainFailure> {
    StatusResolver::is_connectivity(link).then(|| parser.status_mapper.map(GATEWAY_TIMEOUT, link))
}

fn status_failure(parser: &FailedRemoteCallParser, link: Link<'_>) -> Option<DomainFailure> {
    StatusResolver::reported_status(link).map(|status| parser.status_mapper.map(status, link))
}

/// Raw response body exposed by a chain link, if any.
fn response_body(link: Link<'_>) -> Option<&[u8]> {
    link.downcast_ref::<TransportError>().and_then(TransportError::body)
}

/// Walks error chains and classifies them.
#[derive(Clone)]
pub struct FailedRemoteCallParser {
    status_mapper: Arc<dyn StatusMapper>,
    payload_mapper: Arc<dyn PayloadMapper>,
}

impl Default for FailedRemoteCallParser {
    fn default() -> Self {
        Self::new(Arc::new(DefaultStatusMapper), Arc::new(CodeRegistry::with_defaults()))
    }
}

impl fmt::Debug for FailedRemoteCallParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailedRemoteCallParser").finish_non_exhaustive()
    }
}

impl FailedRemoteCallParser {
    /// Parser using the given mappers for statuses and remote payloads
    #[must_use]
    pub fn new(status_mapper: Arc<dyn StatusMapper>, payload_mapper: Arc<dyn PayloadMapper>) -> Self {
        Self { status_mapper, payload_mapper }
    }

    /// Classify `error` and every cause behind it.
    ///
    /// Never fails. Traversal stops as soon as both the local and the
    /// remote failure are known, or when the chain ends.
    #[must_use]
    pub fn parse(&self, error: SharedCause) -> FailedRemoteCall {
        let mut local = None;
        let mut remote = None;
        let mut depth = 0_usize;
        let root: Link<'_> = &*error;
        let mut link = Some(root);

        while let Some(current) = link {
            if local.is_none() {
                local = LOCAL_RULES.iter().find_map(|rule| rule(self, current));
            }
            if remote.is_none() {
                remote = response_body(current).and_then(|body| self.remote_failure(body));
            }
            if local.is_some() && remote.is_some() {
                break;
            }
            depth += 1;
            link = current.source();
        }

        debug!(
            depth,
            local = local.as_ref().map(DomainFailure::status),
            remote = remote.as_ref().and_then(DomainFailure::code),
            "Classified failed remote call"
        );
        FailedRemoteCall { original: error, local, remote }
    }

    /// Convenience for owned errors.
    pub fn parse_error(&self, error: impl StdError + Send + Sync + 'static) -> FailedRemoteCall {
        self.parse(Arc::new(error))
    }

    fn remote_failure(&self, body: &[u8]) -> Option<DomainFailure> {
        trace!(body = %String::from_utf8_lossy(body), "Parsing remote error body");
        let payload = ErrorPayload::parse(body)?;
        self.payload_mapper.map(&payload)
    }
}

/// Result of classifying an error chain
#[derive(Debug, Clone)]
pub struct FailedRemoteCall {
    original: SharedCause,
    local: Option<DomainFailure>,
    remote: Option<DomainFailure>,
}

/// Most specific failure found in a chain.
#[derive(Debug, Clone)]
pub enum DeepCause {
    /// Reconstructed from the remote party's error body
    Remote(DomainFailure),
    /// Derived from locally observable information
    Local(DomainFailure),
    /// Nothing matched; the error as received
    Original(SharedCause),
}

impl DeepCause {
    #[must_use]
    pub const fn as_failure(&self) -> Option<&DomainFailure> {
        match self {
            Self::Remote(failure) | Self::Local(failure) => Some(failure),
            Self::Original(_) => None,
        }
    }
}

impl FailedRemoteCall {
    /// The error as received
    #[must_use]
    pub const fn original(&self) -> &SharedCause {
        &self.original
    }

    #[must_use]
    pub const fn local(&self) -> Option<&DomainFailure> {
        self.local.as_ref()
    }

    #[must_use]
    pub const fn remote(&self) -> Option<&DomainFailure> {
        self.remote.as_ref()
    }

    /// True when at least one rule matched.
    #[must_use]
    pub const fn is_parsed(&self) -> bool {
        self.local.is_some() || self.remote.is_some()
    }

    /// Remote failure, else local failure, else the original error.
    #[must_use]
    pub fn deep_cause(&self) -> DeepCause {
        self.clone().into_deep_cause()
    }

    #[must_use]
    pub fn into_deep_cause(self) -> DeepCause {
        match (self.remote, self.local) {
            (Some(remote), _) => DeepCause::Remote(remote),
            (None, Some(local)) => DeepCause::Local(local),
            (None, None) => DeepCause::Original(self.original),
        }
    }

    /// Deep cause as a domain failure.
    ///
    /// A derived failure without a cause gets the original error attached.
    /// An unclassified error becomes an internal failure wrapping it.
    #[must_use]
    pub fn into_failure(self) -> DomainFailure {
        let original = Arc::clone(&self.original);
        let already_domain = original.is::<DomainFailure>();
        match self.into_deep_cause() {
            DeepCause::Remote(failure) | DeepCause::Local(failure)
                if failure.cause().is_none() && !already_domain =>
            {
                failure.with_shared_cause(original)
            }
            DeepCause::Remote(failure) | DeepCause::Local(failure) => failure,
            DeepCause::Original(error) => {
                DomainFailure::new(FailureKind::Internal, error.to_string()).with_shared_cause(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use reqwest::Method;

    use super::*;
    use crate::decoder::registry::USER_NOT_FOUND;
    use crate::errors::{RetryableFailure, StatusError};

    fn not_found_with_body(body: &str) -> TransportError {
        TransportError::responded(404, Method::GET, "http://svc/users/7", body)
    }

    #[test]
    fn remote_failure_preferred_over_local() {
        let record = FailedRemoteCallParser::default()
            .parse_error(not_found_with_body(r#"{"code":"USER_NOT_FOUND"}"#));

        assert_eq!(record.local().map(DomainFailure::kind), Some(FailureKind::NotFound));
        assert_eq!(record.local().and_then(DomainFailure::code), None);
        assert_eq!(record.remote().and_then(DomainFailure::code), Some(USER_NOT_FOUND));
        match record.deep_cause() {
            DeepCause::Remote(failure) => assert_eq!(failure.code(), Some(USER_NOT_FOUND)),
            other => panic!("expected remote cause, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_body_leaves_remote_unset() {
        for body in ["<html>oops</html>", r#"{"code":""}"#, r#"{"message":"no code"}"#, ""] {
            let record = FailedRemoteCallParser::default().parse_error(not_found_with_body(body));
            assert!(record.remote().is_none(), "body {body:?}");
            assert!(matches!(record.deep_cause(), DeepCause::Local(_)));
        }
    }

    #[test]
    fn unknown_error_keeps_only_original() {
        let record = FailedRemoteCallParser::default().parse_error(std::fmt::Error);

        assert!(!record.is_parsed());
        assert!(matches!(record.deep_cause(), DeepCause::Original(_)));
        let failure = record.into_failure();
        assert_eq!(failure.kind(), FailureKind::Internal);
        assert!(failure.cause().is_some());
    }

    #[test]
    fn domain_failure_accepted_as_is() {
        let failure = DomainFailure::new(FailureKind::Conflict, "version mismatch").with_code("STALE");
        let record = FailedRemoteCallParser::default().parse_error(failure.clone());

        assert_eq!(record.local(), Some(&failure));
        let resolved = record.into_failure();
        assert_eq!(resolved, failure);
        assert!(resolved.cause().is_none());
    }

    #[test]
    fn walks_causes_to_find_connectivity_failure() {
        let io = io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer");
        let wrapped = StatusError::new(599, "opaque proxy failure").with_source(io);
        let record = FailedRemoteCallParser::default().parse_error(wrapped);

        // The outer wrapper already carries a status, so it wins
        assert_eq!(record.local().map(DomainFailure::status), Some(599));

        let record = FailedRemoteCallParser::default()
            .parse_error(AnyWrapper(Box::new(io::Error::new(io::ErrorKind::TimedOut, "slow"))));
        assert_eq!(record.local().map(DomainFailure::kind), Some(FailureKind::ServiceTimeout));
    }

    #[test]
    fn outermost_match_fills_each_slot() {
        let inner = DomainFailure::new(FailureKind::Conflict, "inner");
        let outer = DomainFailure::from_status(502).with_cause(inner);
        let retryable = RetryableFailure::new(502, Method::GET, outer);

        let record = FailedRemoteCallParser::default().parse_error(retryable);
        assert_eq!(record.local().map(DomainFailure::status), Some(502));
        assert!(record.remote().is_none());

        // Local comes from the outer failure, remote from the body behind it
        let transport = not_found_with_body(r#"{"code":"USER_NOT_FOUND"}"#);
        let failure = DomainFailure::from_status(404).with_cause(transport);
        let record = FailedRemoteCallParser::default().parse_error(failure);
        assert_eq!(record.local().and_then(DomainFailure::code), None);
        assert_eq!(record.remote().and_then(DomainFailure::code), Some(USER_NOT_FOUND));
    }

    #[test]
    fn injected_mappers_are_used() {
        let parser = FailedRemoteCallParser::new(
            Arc::new(|status: u16, _: &(dyn StdError + 'static)| {
                DomainFailure::new(FailureKind::from_status(status), "mapped locally")
            }),
            Arc::new(|payload: &ErrorPayload| {
                Some(DomainFailure::new(FailureKind::Forbidden, "mapped remotely").with_code(payload.code.clone()))
            }),
        );

        let record = parser.parse_error(not_found_with_body(r#"{"code":"TENANT_DISABLED"}"#));
        assert_eq!(record.local().map(DomainFailure::message), Some("mapped locally"));
        assert_eq!(record.remote().map(DomainFailure::kind), Some(FailureKind::Forbidden));
    }

    #[test]
    fn derived_failure_keeps_original_as_cause() {
        let record = FailedRemoteCallParser::default()
            .parse_error(not_found_with_body(r#"{"code":"USER_NOT_FOUND"}"#));
        let failure = record.into_failure();

        let cause = failure.source().expect("cause");
        assert!(cause.downcast_ref::<TransportError>().is_some());
    }

    #[derive(Debug)]
    struct AnyWrapper(Box<dyn StdError + Send + Sync>);

    impl fmt::Display for AnyWrapper {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "wrapped: {}", self.0)
        }
    }

    impl StdError for AnyWrapper {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(self.0.as_ref())
        }
    }
}
