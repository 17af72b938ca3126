//! Status resolution for a single chain link

use std::error::Error as StdError;
use std::io;

use outcall_domain::{DomainFailure, FailureKind};

use crate::errors::{RetryableFailure, StatusError, TransportError};

/// Status used whenever no response was received.
pub const GATEWAY_TIMEOUT: u16 = 504;

/// Maps a resolved status and the link it came from to a domain failure.
pub trait StatusMapper: Send + Sync {
    /// Failure for `status`, with `cause` as the link it was resolved from.
    fn map(&self, status: u16, cause: &(dyn StdError + 'static)) -> DomainFailure;
}

impl<F> StatusMapper for F
where
    F: Fn(u16, &(dyn StdError + 'static)) -> DomainFailure + Send + Sync,
{
    fn map(&self, status: u16, cause: &(dyn StdError + 'static)) -> DomainFailure {
        self(status, cause)
    }
}

/// Maps the status to its [`FailureKind`] and uses the link's message.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStatusMapper;

impl StatusMapper for DefaultStatusMapper {
    fn map(&self, status: u16, cause: &(dyn StdError + 'static)) -> DomainFailure {
        DomainFailure::new(FailureKind::from_status(status), cause.to_string())
    }
}

/// Resolves the HTTP status an error stands for.
pub struct StatusResolver;

impl StatusResolver {
    /// Resolve the status of one chain link.
    ///
    /// Tried in order, first match wins:
    /// 1. status carried by a [`DomainFailure`]
    /// 2. connectivity failures, as [`GATEWAY_TIMEOUT`]
    /// 3. transport failures, missing status as [`GATEWAY_TIMEOUT`]
    /// 4. explicit status wrappers
    #[must_use]
    pub fn resolve(link: &(dyn StdError + 'static)) -> Option<u16> {
        if let Some(failure) = link.downcast_ref::<DomainFailure>() {
            return Some(failure.status());
        }
        if Self::is_connectivity(link) {
            return Some(GATEWAY_TIMEOUT);
        }
        Self::reported_status(link)
    }

    /// True for low-level failures where no response was received.
    #[must_use]
    pub fn is_connectivity(link: &(dyn StdError + 'static)) -> bool {
        if link.is::<io::Error>() || link.is::<tokio::time::error::Elapsed>() {
            return true;
        }
        link.downcast_ref::<reqwest::Error>()
            .is_some_and(|err| err.is_connect() || err.is_timeout())
    }

    /// Status reported by a transport failure or a status wrapper.
    #[must_use]
    pub fn reported_status(link: &(dyn StdError + 'static)) -> Option<u16> {
        if let Some(err) = link.downcast_ref::<TransportError>() {
            return Some(err.status().unwrap_or(GATEWAY_TIMEOUT));
        }
        if let Some(err) = link.downcast_ref::<RetryableFailure>() {
            return Some(err.status());
        }
        if let Some(err) = link.downcast_ref::<StatusError>() {
            return Some(err.status());
        }
        link.downcast_ref::<reqwest::Error>()
            .and_then(reqwest::Error::status)
            .map(|status| status.as_u16())
    }
}
