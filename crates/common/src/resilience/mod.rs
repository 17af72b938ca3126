//! Resilience patterns for outbound calls
//!
//! Currently a single pattern: the bounded-attempt [`retry`] engine used
//! both by the remote client and by the credential refresh cache.

pub mod retry;

pub use retry::{
    policies, RetryConfig, RetryConfigBuilder, RetryDecision, RetryError, RetryExecutor,
    RetryOutcome, RetryPolicy, RetryResult, Retryer, BACKOFF_MULTIPLIER,
};
