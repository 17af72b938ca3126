//! # Outcall Domain
//!
//! Domain types shared by every layer of the outbound call resilience stack.
//!
//! This crate contains:
//! - Typed domain failures (`DomainFailure`, `FailureKind`)
//! - The structured error body remote services return (`ErrorPayload`)
//! - Configuration structures for retries and credential refresh
//! - The crate-level error type and Result alias
//!
//! ## Architecture
//! - No dependencies on other Outcall crates
//! - No I/O, no async runtime
//! - Pure data types and their invariants

pub mod config;
pub mod errors;
pub mod failure;
pub mod payload;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use failure::{DomainFailure, FailureKind};
pub use payload::ErrorPayload;
