//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Outcall
///
/// Covers failures of the stack itself (bad configuration, malformed
/// input). Failures of remote calls are reported as
/// [`DomainFailure`](crate::DomainFailure) instead.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum OutcallError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Outcall operations
pub type Result<T> = std::result::Result<T, OutcallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let err = OutcallError::Config("max_attempts missing".into());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#"{"type":"Config","message":"max_attempts missing"}"#);
        assert_eq!(err.to_string(), "Configuration error: max_attempts missing");
    }
}
