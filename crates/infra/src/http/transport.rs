//! Transport seam and its reqwest-backed implementation.

use std::time::Duration;

use async_trait::async_trait;
use outcall_domain::Result;
use reqwest::header::HeaderMap;
use reqwest::Client as ReqwestClient;
use tracing::debug;

use super::request::{OutboundRequest, TransportResponse};
use crate::errors::{client_build_error, send_error, TransportError};

/// Pluggable invoker that sends one request and returns the response.
///
/// Implementations return `Ok` for every response received, whatever its
/// status, and `Err` only when no response could be obtained.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &OutboundRequest)
        -> std::result::Result<TransportResponse, TransportError>;
}

/// [`Transport`] backed by a reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
}

impl ReqwestTransport {
    /// Start building a new transport.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    /// Convenience constructor with default configuration.
    ///
    /// # Errors
    /// Returns `OutcallError::Config` if the reqwest client cannot be built.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Wrap an already configured reqwest client.
    #[must_use]
    pub const fn from_client(client: ReqwestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(
        &self,
        request: &OutboundRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let method = request.method().clone();
        let url = request.url();

        let mut builder =
            self.client.request(method.clone(), url.clone()).headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        debug!(%method, %url, "sending HTTP request");
        let response = builder.send().await.map_err(|err| send_error(method.clone(), url, err))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        debug!(%method, %url, status, "received HTTP response");

        let body = response.bytes().await.map_err(|err| send_error(method, url, err))?;
        Ok(TransportResponse::new(status, headers, body.to_vec()))
    }
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug)]
pub struct ReqwestTransportBuilder {
    timeout: Duration,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    default_headers: Option<HeaderMap>,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: None,
            user_agent: None,
            default_headers: None,
        }
    }
}

impl ReqwestTransportBuilder {
    /// Total time allowed for one attempt, body included.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    /// Build the transport.
    ///
    /// # Errors
    /// Returns `OutcallError::Config` if the reqwest client cannot be built.
    pub fn build(self) -> Result<ReqwestTransport> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder.build().map_err(|err| client_build_error(&err))?;
        Ok(ReqwestTransport { client })
    }
}
