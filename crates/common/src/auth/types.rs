//! Credential value types
//!
//! A [`Credential`] is the immutable value held by the credential cache and
//! rendered into a request header. [`TokenResponse`] is the standard OAuth
//! 2.0 token endpoint body (RFC 6749) and converts into a bearer credential.

use std::fmt;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{CommonError, ErrorClassification, ErrorSeverity};

/// Scheme prefix used for OAuth access tokens
pub const BEARER_PREFIX: &str = "Bearer ";

/// Errors raised while building or obtaining credentials
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// `expires_at` does not come after `issued_at`
    #[error("credential expiry {expires_at} is not after its issue time {issued_at}")]
    InvalidExpiry { issued_at: DateTime<Utc>, expires_at: DateTime<Utc> },

    /// The credential endpoint answered with a non-success status
    #[error("credential endpoint returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The credential endpoint answered with an unreadable body
    #[error("invalid credential response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl ErrorClassification for CredentialError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidExpiry { .. } | Self::InvalidResponse(_) => false,
            Self::Http { status, .. } => *status == 429 || (500..=599).contains(status),
            Self::Common(err) => err.is_retryable(),
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidExpiry { .. } | Self::InvalidResponse(_) => ErrorSeverity::Error,
            Self::Http { .. } => ErrorSeverity::Warning,
            Self::Common(err) => err.severity(),
        }
    }
}

/// Immutable credential rendered into an outgoing header
///
/// An absent `expires_at` means the credential never expires.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    value_prefix: String,
    value: String,
    issued_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// Create a credential
    ///
    /// # Arguments
    /// * `value_prefix` - Scheme label placed before the value, e.g. `"Bearer "`
    /// * `value` - Opaque credential value
    /// * `issued_at` - When the credential was issued
    /// * `expires_at` - When it stops being valid; `None` for never
    ///
    /// # Errors
    /// Returns `CredentialError::InvalidExpiry` if `expires_at` is not
    /// strictly after `issued_at`.
    pub fn new(
        value_prefix: impl Into<String>,
        value: impl Into<String>,
        issued_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Self, CredentialError> {
        if let Some(expires_at) = expires_at {
            if expires_at <= issued_at {
                return Err(CredentialError::InvalidExpiry { issued_at, expires_at });
            }
        }
        Ok(Self { value_prefix: value_prefix.into(), value: value.into(), issued_at, expires_at })
    }

    /// Bearer credential issued at `now`
    ///
    /// A non-positive `expires_in_secs` (or `None`) yields a credential
    /// without expiry.
    #[must_use]
    pub fn bearer(token: impl Into<String>, now: DateTime<Utc>, expires_in_secs: Option<i64>) -> Self {
        let expires_at = expires_in_secs
            .filter(|secs| *secs > 0)
            .and_then(|secs| now.checked_add_signed(ChronoDuration::seconds(secs)));
        Self {
            value_prefix: BEARER_PREFIX.to_string(),
            value: token.into(),
            issued_at: now,
            expires_at,
        }
    }

    /// Credential that never expires
    #[must_use]
    pub fn eternal(value_prefix: impl Into<String>, value: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self { value_prefix: value_prefix.into(), value: value.into(), issued_at: now, expires_at: None }
    }

    #[must_use]
    pub fn value_prefix(&self) -> &str {
        &self.value_prefix
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub const fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    #[must_use]
    pub const fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// True once `now` has reached `expires_at`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    /// Header value: prefix plus value, prefix omitted when blank
    ///
    /// Returns an empty string when the value itself is blank.
    #[must_use]
    pub fn header_value(&self) -> String {
        if self.value.trim().is_empty() {
            return String::new();
        }
        if self.value_prefix.trim().is_empty() {
            return self.value.clone();
        }
        format!("{}{}", self.value_prefix, self.value)
    }
}

// Keep the secret out of logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("value_prefix", &self.value_prefix)
            .field("value", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// OAuth token response from authorization server
///
/// Standard OAuth 2.0 token response format (RFC 6749).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Convert into a bearer credential issued at `now`
    #[must_use]
    pub fn into_credential(self, now: DateTime<Utc>) -> Credential {
        Credential::bearer(self.access_token, now, self.expires_in)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_expiry_not_after_issue() {
        let now = Utc::now();
        let err = Credential::new("Bearer ", "t", now, Some(now)).unwrap_err();
        assert!(matches!(err, CredentialError::InvalidExpiry { .. }));
        assert!(!err.is_retryable());

        assert!(Credential::new("Bearer ", "t", now, Some(now - ChronoDuration::seconds(1))).is_err());
        assert!(Credential::new("Bearer ", "t", now, None).is_ok());
    }

    #[test]
    fn header_value_renders_prefix_and_value() {
        let now = Utc::now();
        assert_eq!(Credential::bearer("abc", now, Some(60)).header_value(), "Bearer abc");
        assert_eq!(Credential::eternal("", "raw-key", now).header_value(), "raw-key");
        assert_eq!(Credential::eternal("  ", "raw-key", now).header_value(), "raw-key");
        assert_eq!(Credential::eternal("Basic ", " ", now).header_value(), "");
    }

    #[test]
    fn bearer_expiry_follows_expires_in() {
        let now = Utc::now();
        let credential = Credential::bearer("abc", now, Some(3600));
        assert_eq!(credential.expires_at(), Some(now + ChronoDuration::seconds(3600)));
        assert!(!credential.is_expired_at(now));
        assert!(credential.is_expired_at(now + ChronoDuration::seconds(3600)));

        assert_eq!(Credential::bearer("abc", now, None).expires_at(), None);
        assert_eq!(Credential::bearer("abc", now, Some(0)).expires_at(), None);
    }

    #[test]
    fn token_response_maps_to_bearer_credential() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"tok","token_type":"bearer","expires_in":300}"#,
        )
        .unwrap();
        let now = Utc::now();
        let credential = response.into_credential(now);

        assert_eq!(credential.header_value(), "Bearer tok");
        assert_eq!(credential.issued_at(), now);
        assert_eq!(credential.expires_at(), Some(now + ChronoDuration::seconds(300)));
    }

    #[test]
    fn debug_output_redacts_value() {
        let credential = Credential::bearer("super-secret", Utc::now(), None);
        assert!(!format!("{credential:?}").contains("super-secret"));
    }

    #[test]
    fn http_errors_retry_on_server_side_statuses() {
        let server = CredentialError::Http { status: 503, message: "unavailable".into() };
        let client = CredentialError::Http { status: 401, message: "invalid_client".into() };
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
    }
}
