//! Header injection
//!
//! A [`HeaderInjector`] supplies one header for every outgoing request. The
//! header is only set when its value is non-blank, so a credential cache
//! that has nothing to offer leaves the request untouched.

pub mod basic_auth;
pub mod expirable;
pub mod oauth;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::http::OutboundRequest;

pub use basic_auth::{BasicAuthInjector, BasicCredentials};
pub use expirable::ExpirableHeaderInjector;
pub use oauth::{OAuthClientCredentialsSource, OAuthClientCredentialsSourceBuilder};

/// Supplies one header for outgoing requests.
#[async_trait]
pub trait HeaderInjector: Send + Sync {
    fn header_name(&self) -> &str;

    /// Current header value, `""` when none is available.
    async fn header_value(&self) -> String;

    /// Set the header on `request` unless the value is blank.
    async fn apply(&self, request: &mut OutboundRequest) {
        let value = self.header_value().await;
        let header = self.header_name();
        if value.trim().is_empty() {
            debug!(header, "No value available, header not set");
            return;
        }
        if let Err(err) = request.set_header(header, &value) {
            warn!(header, error = %err, "Dropping header with invalid value");
        }
    }
}
