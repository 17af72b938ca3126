//! Basic authentication header injector.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use outcall_common::auth::{Credential, CredentialError, CredentialSource};
use outcall_common::time::{Clock, SystemClock};

use super::HeaderInjector;

/// Scheme prefix for basic authentication
pub const BASIC_PREFIX: &str = "Basic ";

/// Static username and password
///
/// Also usable as a [`CredentialSource`] producing a credential that never
/// expires.
#[derive(Clone)]
pub struct BasicCredentials {
    username: String,
    password: String,
    clock: Arc<dyn Clock>,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into(), clock: Arc::new(SystemClock) }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// `base64(username:password)`
    #[must_use]
    pub fn encode(&self) -> String {
        STANDARD.encode(format!("{}:{}", self.username, self.password))
    }
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialSource for BasicCredentials {
    async fn obtain_fresh_credential(&self) -> Result<Option<Credential>, CredentialError> {
        if self.username.is_empty() {
            return Ok(None);
        }
        Ok(Some(Credential::eternal(BASIC_PREFIX, self.encode(), self.clock.now())))
    }
}

/// Injects a fixed `Authorization: Basic ...` header.
#[derive(Clone)]
pub struct BasicAuthInjector {
    value: String,
}

impl BasicAuthInjector {
    #[must_use]
    pub fn new(credentials: &BasicCredentials) -> Self {
        Self { value: format!("{BASIC_PREFIX}{}", credentials.encode()) }
    }
}

impl fmt::Debug for BasicAuthInjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BasicAuthInjector")
    }
}

#[async_trait]
impl HeaderInjector for BasicAuthInjector {
    fn header_name(&self) -> &str {
        "Authorization"
    }

    async fn header_value(&self) -> String {
        self.value.clone()
    }
}
