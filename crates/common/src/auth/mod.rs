//! Credential management for outgoing calls
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ CredentialCache  │  single slot, get-or-load, background refresh
//! └────────┬─────────┘
//!          │
//!          ├──► CredentialSource   (issuer, e.g. OAuth token endpoint)
//!          ├──► RetryExecutor      (bounded retries per load)
//!          ├──► plan_refresh       (refresh-ahead decision)
//!          └──► AlertSink          (notified when a load yields nothing)
//! ```

pub mod cache;
pub mod schedule;
pub mod traits;
pub mod types;

pub use cache::{CacheSettings, CredentialCache};
pub use schedule::{plan_refresh, RefreshAhead, RefreshPlan};
pub use traits::{
    AlertSink, CredentialRefreshFailure, CredentialSource, RefreshFailureReason, TracingAlertSink,
};
pub use types::{Credential, CredentialError, TokenResponse, BEARER_PREFIX};
