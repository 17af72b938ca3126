//! Remote error decoder
//!
//! Turns a failed response into either a final [`DomainFailure`] or a
//! [`RetryableFailure`] the remote client acts on.

use std::sync::Arc;
use std::time::Duration;

use outcall_domain::DomainFailure;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Method;
use tracing::debug;

use super::parser::FailedRemoteCallParser;
use super::status::GATEWAY_TIMEOUT;
use crate::errors::{RetryableFailure, TransportError};
use crate::http::{OutboundRequest, TransportResponse};

/// Status a transport reports when the request never reached the remote
/// party.
pub const NO_RESPONSE: i32 = -1;

/// Normalize a raw status before classification.
///
/// `-1` (and any other negative value) becomes 504. A remote 500 becomes
/// 502 so it is not confused with this service's own internal errors.
#[must_use]
pub fn normalize_status(status: i32) -> u16 {
    match status {
        500 => 502,
        status => u16::try_from(status).unwrap_or(GATEWAY_TIMEOUT),
    }
}

/// A normalized status is retryable when it is a 5xx and the method is not
/// POST.
#[must_use]
pub fn is_retryable(status: u16, method: &Method) -> bool {
    matches!(status, 500..=599) && *method != Method::POST
}

/// `Retry-After` in delay-seconds form
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// A response that did not succeed
#[derive(Debug, Clone)]
pub struct FailedResponse {
    status: i32,
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl FailedResponse {
    pub fn new(status: i32, method: Method, url: impl Into<String>) -> Self {
        Self { status, method, url: url.into(), headers: HeaderMap::new(), body: Vec::new() }
    }

    /// Pair a received response with the request that produced it.
    #[must_use]
    pub fn from_response(request: &OutboundRequest, response: TransportResponse) -> Self {
        let status = i32::from(response.status());
        let headers = response.headers().clone();
        Self {
            status,
            method: request.method().clone(),
            url: request.url().to_string(),
            headers,
            body: response.into_body(),
        }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Raw status, [`NO_RESPONSE`] if nothing was received
    #[must_use]
    pub const fn status(&self) -> i32 {
        self.status
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Verdict for one failed attempt
#[derive(Debug, Clone)]
pub enum Decoded {
    /// Report this failure to the caller
    Failure(DomainFailure),
    /// Try again if attempts remain
    Retryable(RetryableFailure),
}

impl Decoded {
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }

    /// Failure the caller sees, unwrapping a retryable verdict.
    #[must_use]
    pub fn into_failure(self) -> DomainFailure {
        match self {
            Self::Failure(failure) => failure,
            Self::Retryable(retryable) => retryable.into_domain_failure(),
        }
    }
}

/// Decides what a failed response means for the caller.
#[derive(Debug, Clone, Default)]
pub struct ErrorDecoder {
    parser: FailedRemoteCallParser,
}

impl ErrorDecoder {
    #[must_use]
    pub const fn new(parser: FailedRemoteCallParser) -> Self {
        Self { parser }
    }

    #[must_use]
    pub const fn parser(&self) -> &FailedRemoteCallParser {
        &self.parser
    }

    /// Decode one failed response.
    #[must_use]
    pub fn decode(&self, response: &FailedResponse) -> Decoded {
        let status = normalize_status(response.status);
        let method = response.method.clone();
        let failure = self.classify(
            TransportError::responded(status, method.clone(), &*response.url, response.body.clone()),
        );

        // The transport already considers this retryable; pass it on as is
        if let Some(delay) = retry_after(&response.headers) {
            debug!(status, %method, retry_after_secs = delay.as_secs(), "Remote party asked for a retry");
            return Decoded::Retryable(
                RetryableFailure::new(status, method, failure).with_retry_after(delay),
            );
        }

        let retryable = is_retryable(status, &method);
        debug!(raw_status = response.status, status, %method, retryable, "Decoded failed response");
        if retryable {
            Decoded::Retryable(RetryableFailure::new(status, method, failure))
        } else {
            Decoded::Failure(failure)
        }
    }

    /// Wrap a failure where no response was received.
    ///
    /// Always retryable, whatever the method.
    #[must_use]
    pub fn decode_transport_error(&self, error: TransportError) -> RetryableFailure {
        let status = error.status().unwrap_or_else(|| normalize_status(NO_RESPONSE));
        let method = error.method().clone();
        debug!(status, %method, error = %error, "Transport failed before a response was received");
        RetryableFailure::new(status, method, self.classify(error))
    }

    fn classify(&self, error: TransportError) -> DomainFailure {
        self.parser.parse(Arc::new(error)).into_failure()
    }
}
