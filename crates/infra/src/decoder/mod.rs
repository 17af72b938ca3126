//! Failure classification and decoding
//!
//! ```text
//! failed response ──► ErrorDecoder ──► FailedRemoteCallParser ──► DeepCause
//!                         │                  │
//!                         │                  ├─ StatusResolver / StatusMapper  (local)
//!                         │                  └─ ErrorPayload / PayloadMapper   (remote)
//!                         ▼
//!              Decoded::Failure | Decoded::Retryable
//! ```
//!
//! The parser walks an error's `source()` chain from the outermost wrapper
//! toward the root cause. At each link it tries an ordered list of typed
//! rules for the local failure and, when the link carries a response body,
//! parses the body for the remote failure. It stops once both are known.

pub mod error_decoder;
pub mod parser;
pub mod registry;
pub mod status;

// Re-export commonly used items
pub use error_decoder::{is_retryable, normalize_status, Decoded, ErrorDecoder, FailedResponse};
pub use parser::{DeepCause, FailedRemoteCall, FailedRemoteCallParser};
pub use registry::{CodeRegistry, PayloadMapper, USER_NOT_FOUND};
pub use status::{DefaultStatusMapper, StatusMapper, StatusResolver, GATEWAY_TIMEOUT};
