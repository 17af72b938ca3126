//! Retrying client that sends requests through a [`Transport`].
//!
//! Each call injects headers, decodes failures and backs off between
//! retryable attempts with a fresh [`Retryer`].

use std::sync::Arc;
use std::time::Duration;

use outcall_common::resilience::{RetryConfig, Retryer};
use outcall_domain::{DomainFailure, Result};
use tracing::{debug, instrument};

use super::request::{OutboundRequest, TransportResponse};
use super::transport::{ReqwestTransport, Transport};
use crate::decoder::{Decoded, ErrorDecoder, FailedRemoteCallParser, FailedResponse};
use crate::injector::HeaderInjector;

/// Result of one call together with its attempt statistics
#[derive(Debug)]
pub struct RemoteCallOutcome {
    pub result: std::result::Result<TransportResponse, DomainFailure>,
    pub attempts: u32,
    /// Backoff delays slept between attempts, in order
    pub delays: Vec<Duration>,
}

impl RemoteCallOutcome {
    fn finish(
        result: std::result::Result<TransportResponse, DomainFailure>,
        retryer: Retryer,
    ) -> Self {
        let attempts = retryer.attempt();
        Self { result, attempts, delays: retryer.into_delays() }
    }
}

/// Remote client with header injection, error decoding and retries.
///
/// Every call gets its own [`Retryer`], so concurrent calls never share
/// attempt counters. Callers only ever see a [`DomainFailure`]; use
/// [`ErrorDecoder::parser`] on it to get the deep cause.
#[derive(Clone)]
pub struct RemoteClient {
    transport: Arc<dyn Transport>,
    decoder: ErrorDecoder,
    retry: RetryConfig,
    injectors: Vec<Arc<dyn HeaderInjector>>,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("retry", &self.retry)
            .field("injectors", &self.injectors.iter().map(|i| i.header_name()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl RemoteClient {
    /// Start building a new client.
    pub fn builder() -> RemoteClientBuilder {
        RemoteClientBuilder::default()
    }

    #[must_use]
    pub const fn decoder(&self) -> &ErrorDecoder {
        &self.decoder
    }

    #[must_use]
    pub const fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Send `request`, retrying retryable failures.
    ///
    /// # Errors
    /// Returns the decoded [`DomainFailure`] of the last attempt.
    pub async fn send(
        &self,
        request: OutboundRequest,
    ) -> std::result::Result<TransportResponse, DomainFailure> {
        self.send_with_outcome(request).await.result
    }

    /// Like [`send`](Self::send), also reporting attempts and delays.
    #[instrument(skip(self, request), fields(method = %request.method(), url = %request.url()))]
    pub async fn send_with_outcome(&self, request: OutboundRequest) -> RemoteCallOutcome {
        let mut retryer = self.retry.retryer();

        loop {
            let retryable = match self.attempt(&request, retryer.attempt()).await {
                Ok(response) => return RemoteCallOutcome::finish(Ok(response), retryer),
                Err(Decoded::Failure(failure)) => {
                    return RemoteCallOutcome::finish(Err(failure), retryer)
                }
                Err(Decoded::Retryable(retryable)) => retryable,
            };

            let requested = retryable.retry_after();
            if let Some(retry_after) = requested {
                debug!(retry_after_secs = retry_after.as_secs(), "Remote party requested a delay");
            }
            if !retryer.backoff_after(requested).await {
                return RemoteCallOutcome::finish(Err(retryable.into_domain_failure()), retryer);
            }
        }
    }

    async fn attempt(
        &self,
        request: &OutboundRequest,
        attempt: u32,
    ) -> std::result::Result<TransportResponse, Decoded> {
        // Headers are resolved per attempt so a refreshed credential is
        // picked up on retry
        let mut request = request.clone();
        for injector in &self.injectors {
            injector.apply(&mut request).await;
        }

        match self.transport.execute(&request).await {
            Ok(response) if response.is_success() => {
                debug!(attempt, status = response.status(), "Remote call succeeded");
                Ok(response)
            }
            Ok(response) => {
                debug!(attempt, status = response.status(), "Remote call failed");
                Err(self.decoder.decode(&FailedResponse::from_response(&request, response)))
            }
            Err(error) => {
                debug!(attempt, error = %error, "Remote call got no response");
                Err(Decoded::Retryable(self.decoder.decode_transport_error(error)))
            }
        }
    }
}

/// Builder for [`RemoteClient`].
#[derive(Default)]
pub struct RemoteClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    retry: Option<RetryConfig>,
    parser: Option<FailedRemoteCallParser>,
    injectors: Vec<Arc<dyn HeaderInjector>>,
}

impl RemoteClientBuilder {
    /// Transport to send requests through (default: [`ReqwestTransport`])
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Retry settings (default: [`RetryConfig::default`])
    #[must_use]
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Parser used to classify failures, with its mappers
    #[must_use]
    pub fn parser(mut self, parser: FailedRemoteCallParser) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Add a header injector; injectors run in insertion order.
    #[must_use]
    pub fn injector(mut self, injector: Arc<dyn HeaderInjector>) -> Self {
        self.injectors.push(injector);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    /// Returns `OutcallError::Config` if the default transport cannot be
    /// built.
    pub fn build(self) -> Result<RemoteClient> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };

        Ok(RemoteClient {
            transport,
            decoder: ErrorDecoder::new(self.parser.unwrap_or_default()),
            retry: self.retry.unwrap_or_default(),
            injectors: self.injectors,
        })
    }
}
