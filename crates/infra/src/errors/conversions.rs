//! Conversions from reqwest errors into crate errors.

use outcall_domain::OutcallError;
use reqwest::Method;

use super::TransportError;

/// Map a failure to construct a reqwest client into a configuration error.
pub(crate) fn client_build_error(err: &reqwest::Error) -> OutcallError {
    OutcallError::Config(format!("Failed to build HTTP client: {err}"))
}

/// Map a reqwest send or body-read failure into a transport error without
/// a status.
pub(crate) fn send_error(method: Method, url: &reqwest::Url, err: reqwest::Error) -> TransportError {
    TransportError::no_response(method, url.as_str(), err)
}
