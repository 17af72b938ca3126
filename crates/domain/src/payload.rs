//! Structured error body returned by remote services

use serde::{Deserialize, Serialize};

/// Error body a remote service returns alongside a non-2xx status.
///
/// Only `code` is required. Bodies without a non-blank code are not
/// treated as structured errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    /// Business error code, e.g. `USER_NOT_FOUND`
    pub code: String,

    /// Human readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// HTTP status the remote service associated with the error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Correlation id assigned by the remote service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ErrorPayload {
    /// Parse a raw response body.
    ///
    /// Returns `None` when the body is not JSON, does not match the
    /// payload shape, or carries a blank code.
    #[must_use]
    pub fn parse(body: &[u8]) -> Option<Self> {
        serde_json::from_slice::<Self>(body).ok().filter(|payload| !payload.code.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_body() {
        let payload = ErrorPayload::parse(br#"{"code":"USER_NOT_FOUND"}"#).unwrap();
        assert_eq!(payload.code, "USER_NOT_FOUND");
        assert!(payload.message.is_none());
        assert!(payload.status.is_none());
    }

    #[test]
    fn parses_full_body_with_unknown_fields() {
        let body = br#"{
            "code": "ORDER_LOCKED",
            "message": "order 7 is locked",
            "status": 409,
            "traceId": "abc-123",
            "timestamp": "2024-01-01T00:00:00Z"
        }"#;
        let payload = ErrorPayload::parse(body).unwrap();
        assert_eq!(payload.status, Some(409));
        assert_eq!(payload.trace_id.as_deref(), Some("abc-123"));
    }

    #[test]
    fn rejects_unstructured_bodies() {
        assert!(ErrorPayload::parse(b"<html>Bad Gateway</html>").is_none());
        assert!(ErrorPayload::parse(b"").is_none());
        assert!(ErrorPayload::parse(br#"{"message":"no code"}"#).is_none());
        assert!(ErrorPayload::parse(br#"{"code":"   "}"#).is_none());
    }
}
