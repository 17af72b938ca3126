//! Errors that travel inside failure cause chains
//!
//! Every type here implements [`std::error::Error`] by hand so that
//! `source()` hands out the concrete inner error. The classifier relies on
//! that to downcast each chain link.

mod chain;
mod conversions;

pub use chain::{RetryableFailure, StatusError, TransportError};
pub(crate) use conversions::{client_build_error, send_error};
