//! Testing utilities and helpers
//!
//! - **[`mocks`]**: scripted credential sources and recording alert sinks
//!
//! ## Usage
//!
//! ```rust
//! # #[cfg(feature = "test-utils")]
//! # {
//! use outcall_common::testing::{MockCredentialSource, RecordingAlertSink};
//!
//! let source = MockCredentialSource::new();
//! let alerts = RecordingAlertSink::new();
//! assert_eq!(source.calls(), 0);
//! assert!(alerts.alerts().is_empty());
//! # }
//! ```

pub mod mocks;

pub use crate::time::MockClock;
pub use mocks::{MockCredentialSource, RecordingAlertSink};
