//! Request and response values exchanged with a [`Transport`](super::Transport)

use std::borrow::Cow;

use outcall_domain::{OutcallError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;

/// Fully buffered outbound request
///
/// The body is owned bytes so the request can be replayed on every retry.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl OutboundRequest {
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: HeaderMap::new(), body: None }
    }

    /// Build a request from a URL string.
    ///
    /// # Errors
    /// Returns `OutcallError::InvalidInput` if the URL does not parse.
    pub fn parse(method: Method, url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| OutcallError::InvalidInput(format!("Invalid URL '{url}': {e}")))?;
        Ok(Self::new(method, url))
    }

    /// Set a header, replacing any previous value.
    ///
    /// # Errors
    /// Returns `OutcallError::InvalidInput` if the name or value is not a
    /// valid HTTP header.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| OutcallError::InvalidInput(format!("Invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| OutcallError::InvalidInput(format!("Invalid value for {name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Builder-style variant of [`set_header`](Self::set_header).
    ///
    /// # Errors
    /// See [`set_header`](Self::set_header).
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        self.set_header(name, value)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as text, if present and visible ASCII
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    #[must_use]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}

/// Response returned by a transport, body fully read
#[derive(Debug, Clone)]
pub struct TransportResponse {
    status: u16,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl TransportResponse {
    #[must_use]
    pub const fn new(status: u16, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self { status, headers, body }
    }

    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// True for 2xx statuses
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, 200..=299)
    }

    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[must_use]
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// Body decoded as UTF-8, invalid sequences replaced
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Deserialize the body as JSON.
    ///
    /// # Errors
    /// Returns the `serde_json` error if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_url_and_header() {
        assert!(matches!(
            OutboundRequest::parse(Method::GET, "not a url"),
            Err(OutcallError::InvalidInput(_))
        ));

        let mut request = OutboundRequest::parse(Method::GET, "http://svc/users").unwrap();
        assert!(request.set_header("Authorization", "Bearer a\nb").is_err());
        assert!(request.set_header("bad header", "x").is_err());
        assert!(request.header("Authorization").is_none());
    }

    #[test]
    fn set_header_replaces_previous_value() {
        let request = OutboundRequest::parse(Method::PUT, "http://svc/users/7")
            .and_then(|r| r.with_header("X-Tenant", "a"))
            .and_then(|r| r.with_header("x-tenant", "b"))
            .unwrap()
            .with_body(br#"{"name":"x"}"#.to_vec());

        assert_eq!(request.header("X-Tenant"), Some("b"));
        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.body(), Some(br#"{"name":"x"}"#.as_slice()));
    }

    #[test]
    fn response_helpers() {
        let response = TransportResponse::new(201, HeaderMap::new(), br#"{"id":7}"#.to_vec());
        assert!(response.is_success());
        assert_eq!(response.text(), r#"{"id":7}"#);
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["id"], 7);

        assert!(!TransportResponse::new(304, HeaderMap::new(), Vec::new()).is_success());
    }
}
