//! OAuth 2.0 client-credentials grant as a credential source

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use outcall_common::auth::{Credential, CredentialError, CredentialSource, TokenResponse};
use outcall_common::error::CommonError;
use outcall_common::time::{Clock, SystemClock};
use outcall_domain::{OutcallError, Result};
use reqwest::{Client, Url};
use tracing::{debug, instrument};

use crate::errors::client_build_error;

/// Obtains bearer tokens from a token endpoint (RFC 6749 section 4.4).
///
/// Meant to sit behind a [`CredentialCache`](outcall_common::auth::CredentialCache);
/// every call performs one token request.
#[derive(Clone)]
pub struct OAuthClientCredentialsSource {
    client: Client,
    token_url: Url,
    client_id: String,
    client_secret: String,
    scope: Option<String>,
    clock: Arc<dyn Clock>,
}

impl OAuthClientCredentialsSource {
    pub fn builder(
        token_url: Url,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> OAuthClientCredentialsSourceBuilder {
        OAuthClientCredentialsSourceBuilder {
            token_url,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: None,
            timeout: Duration::from_secs(30),
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub const fn token_url(&self) -> &Url {
        &self.token_url
    }

    fn request_error(&self, err: &reqwest::Error) -> CredentialError {
        let service = self.token_url.host_str().unwrap_or("token endpoint");
        if err.is_connect() || err.is_timeout() || err.is_request() {
            CommonError::backend_retryable(service, err.to_string()).into()
        } else {
            CommonError::backend_permanent(service, err.to_string()).into()
        }
    }
}

impl fmt::Debug for OAuthClientCredentialsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthClientCredentialsSource")
            .field("token_url", &self.token_url.as_str())
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialSource for OAuthClientCredentialsSource {
    #[instrument(skip(self), fields(token_url = %self.token_url))]
    async fn obtain_fresh_credential(&self) -> std::result::Result<Option<Credential>, CredentialError> {
        let mut params = vec![("grant_type", "client_credentials")];
        if let Some(scope) = &self.scope {
            params.push(("scope", scope.as_str()));
        }

        let response = self
            .client
            .post(self.token_url.clone())
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&params)
            .send()
            .await
            .map_err(|err| self.request_error(&err))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CredentialError::Http { status: status.as_u16(), message });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| CredentialError::InvalidResponse(err.to_string()))?;

        if token.access_token.trim().is_empty() {
            debug!("Token endpoint returned a blank access token");
            return Ok(None);
        }

        debug!(expires_in = ?token.expires_in, "Obtained access token");
        Ok(Some(token.into_credential(self.clock.now())))
    }
}

/// Builder for [`OAuthClientCredentialsSource`].
pub struct OAuthClientCredentialsSourceBuilder {
    token_url: Url,
    client_id: String,
    client_secret: String,
    scope: Option<String>,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl OAuthClientCredentialsSourceBuilder {
    /// Space separated scopes to request
    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build the source.
    ///
    /// # Errors
    /// Returns `OutcallError::Config` if the client id is blank or the HTTP
    /// client cannot be built.
    pub fn build(self) -> Result<OAuthClientCredentialsSource> {
        if self.client_id.trim().is_empty() {
            return Err(OutcallError::Config("OAuth client id must not be blank".into()));
        }

        let client = Client::builder()
            .timeout(self.timeout)
            .no_proxy()
            .build()
            .map_err(|err| client_build_error(&err))?;

        Ok(OAuthClientCredentialsSource {
            client,
            token_url: self.token_url,
            client_id: self.client_id,
            client_secret: self.client_secret,
            scope: self.scope,
            clock: self.clock,
        })
    }
}

#[cfg(test)]
mod tests {
    use outcall_common::error::ErrorClassification;
    use outcall_common::testing::MockClock;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn source(server: &MockServer, clock: &MockClock) -> OAuthClientCredentialsSource {
        let url = Url::parse(&format!("{}/oauth/token", server.uri())).unwrap();
        OAuthClientCredentialsSource::builder(url, "svc", "s3cret")
            .scope("users:read")
            .clock(Arc::new(clock.clone()))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn exchanges_client_credentials_for_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(header("authorization", "Basic c3ZjOnMzY3JldA=="))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("scope=users%3Aread"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-1",
                "token_type": "Bearer",
                "expires_in": 300
            })))
            .expect(1)
            .mount(&server)
            .await;

        let clock = MockClock::new();
        let credential = source(&server, &clock).obtain_fresh_credential().await.unwrap().unwrap();

        assert_eq!(credential.header_value(), "Bearer tok-1");
        assert_eq!(credential.issued_at(), clock.now());
        assert_eq!(credential.expires_at(), Some(clock.now() + chrono::Duration::seconds(300)));
    }

    #[tokio::test]
    async fn error_statuses_are_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
            .mount(&server)
            .await;

        let clock = MockClock::new();
        let source = source(&server, &clock);

        let err = source.obtain_fresh_credential().await.unwrap_err();
        assert!(matches!(err, CredentialError::Http { status: 503, .. }));
        assert!(err.is_retryable());

        let err = source.obtain_fresh_credential().await.unwrap_err();
        assert!(matches!(&err, CredentialError::Http { status: 401, message } if message == "invalid_client"));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = source(&server, &MockClock::new()).obtain_fresh_credential().await.unwrap_err();
        assert!(matches!(err, CredentialError::InvalidResponse(_)));
    }

    #[test]
    fn rejects_blank_client_id() {
        let url = Url::parse("http://idp/oauth/token").unwrap();
        let err = OAuthClientCredentialsSource::builder(url, " ", "secret").build().unwrap_err();
        assert!(matches!(err, OutcallError::Config(_)));
    }
}
