//! Outbound HTTP plumbing
//!
//! [`Transport`] is the pluggable invoker; [`RemoteClient`] decorates it with
//! header injection, error decoding and retries.

pub mod client;
pub mod request;
pub mod transport;

// Re-export commonly used items
pub use client::{RemoteCallOutcome, RemoteClient, RemoteClientBuilder};
pub use request::{OutboundRequest, TransportResponse};
pub use transport::{ReqwestTransport, ReqwestTransportBuilder, Transport};
