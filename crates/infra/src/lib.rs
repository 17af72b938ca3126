//! # Outcall Infrastructure
//!
//! I/O side of the outbound call resilience stack.
//!
//! This crate contains:
//! - The remote client that drives retries around a transport
//! - The remote error decoder and exception chain classifier
//! - Header injectors backed by the credential refresh cache
//! - Configuration loading (environment variables, TOML, JSON)
//!
//! ## Architecture
//! - Implements the seams defined in `outcall-common` (credential sources,
//!   retry engine) over `reqwest`
//! - Depends on `outcall-common` and `outcall-domain`
//! - Contains all "impure" code (network, environment, files)

pub mod config;
pub mod decoder;
pub mod errors;
pub mod http;
pub mod injector;

// Re-export commonly used items
pub use decoder::{Decoded, DeepCause, ErrorDecoder, FailedRemoteCall, FailedRemoteCallParser};
pub use errors::{RetryableFailure, StatusError, TransportError};
pub use http::{RemoteCallOutcome, RemoteClient, RemoteClientBuilder, Transport};
pub use injector::{BasicAuthInjector, ExpirableHeaderInjector, HeaderInjector};
