//! Wall-clock abstraction
//!
//! Credential expiry is expressed in UTC wall-clock time. Components that
//! compare against "now" take a [`Clock`] so tests can drive time by hand.

mod clock;

pub use clock::{Clock, MockClock, SystemClock};
