//! Bounded-attempt retry engine with 1.5x exponential backoff
//!
//! Retry settings ([`RetryConfig`]) are immutable and shared freely. The
//! mutable part, the attempt counter, lives in a [`Retryer`] that is created
//! fresh for every top-level call, so unrelated calls never share backoff
//! state.
//!
//! The delay slept after the failure of attempt `n` (1-indexed) is
//! `min(initial_delay * 1.5^(n-1), max_delay)`.

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, instrument, warn};

use crate::error::ErrorClassification;

/// Growth factor applied to the delay after every failed attempt
pub const BACKOFF_MULTIPLIER: f64 = 1.5;

/// Errors that can occur during retry operations
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// All retry attempts have been exhausted
    #[error("All retry attempts exhausted after {attempts} tries: {last_error}")]
    AttemptsExhausted { attempts: u32, last_error: E },

    /// The operation failed with a non-retryable error
    #[error("Operation failed with non-retryable error: {source}")]
    NonRetryable { source: E },

    /// The retry configuration is invalid
    #[error("Invalid retry configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl<E> RetryError<E> {
    /// Consume the error and return the last operation error, if any.
    pub fn into_last_error(self) -> Option<E> {
        match self {
            Self::AttemptsExhausted { last_error, .. } => Some(last_error),
            Self::NonRetryable { source } => Some(source),
            Self::InvalidConfiguration { .. } => None,
        }
    }
}

/// Result type for retry operations
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Immutable retry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    initial_delay: Duration,
    max_delay: Duration,
    max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            max_attempts: 5,
        }
    }
}

impl RetryConfig {
    /// Create a validated configuration.
    ///
    /// # Errors
    /// Returns `RetryError::InvalidConfiguration` if `max_delay` is lower
    /// than `initial_delay`.
    pub fn new(
        initial_delay: Duration,
        max_delay: Duration,
        max_attempts: u32,
    ) -> Result<Self, RetryError<Infallible>> {
        let config = Self { initial_delay, max_delay, max_attempts };
        config.validate()?;
        Ok(config)
    }

    /// Create a configuration builder
    #[must_use]
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Configuration that performs exactly one attempt
    #[must_use]
    pub const fn no_retry() -> Self {
        Self { initial_delay: Duration::ZERO, max_delay: Duration::ZERO, max_attempts: 1 }
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns `RetryError::InvalidConfiguration` if `max_delay` is lower
    /// than `initial_delay`.
    pub fn validate(&self) -> Result<(), RetryError<Infallible>> {
        if self.max_delay < self.initial_delay {
            return Err(RetryError::InvalidConfiguration {
                message: format!(
                    "max_delay ({:?}) must not be lower than initial_delay ({:?})",
                    self.max_delay, self.initial_delay
                ),
            });
        }
        Ok(())
    }

    /// Delay before the first retry
    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Upper bound for a single delay
    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Total attempts including the first one; 0 and 1 disable retries
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to sleep after attempt `attempt` (1-indexed) failed.
    ///
    /// Millisecond arithmetic: the sub-millisecond part of `initial_delay` is
    /// dropped before scaling and the product is truncated, so 100 ms grows
    /// as 100, 150, 225, 337 ms and an initial delay below 1 ms yields zero.
    /// The result is capped at `max_delay`. Attempt 0 is treated as
    /// attempt 1.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled_ms = self.initial_delay.as_millis() as f64 * BACKOFF_MULTIPLIER.powi(exponent);
        // float-to-int casts saturate, so an infinite product lands on u64::MAX
        let delay = Duration::from_millis(scaled_ms as u64);
        delay.min(self.max_delay)
    }

    /// Start a new per-call attempt counter.
    #[must_use]
    pub fn retryer(&self) -> Retryer {
        Retryer::new(*self)
    }
}

/// Builder for `RetryConfig` with fluent API
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    /// Builder seeded with [`RetryConfig::default`]
    #[must_use]
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    /// Delay after the first failed attempt
    #[must_use]
    pub const fn initial_delay(mut self, delay: Duration) -> Self {
        self.config.initial_delay = delay;
        self
    }

    /// Upper bound for any delay
    #[must_use]
    pub const fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    /// Total attempts, the first one included
    #[must_use]
    pub const fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Validate and build the configuration
    ///
    /// # Errors
    /// Returns `RetryError::InvalidConfiguration` if the settings are
    /// inconsistent.
    pub fn build(self) -> Result<RetryConfig, RetryError<Infallible>> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Verdict of the retry engine after a retryable failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given delay, then attempt again
    Continue(Duration),
    /// Attempts are exhausted; propagate the last failure
    GiveUp,
}

/// Per-call attempt counter
///
/// Starts at attempt 1. Deliberately not `Clone`: use [`Retryer::fresh`] to
/// get an independent counter for another call.
#[derive(Debug)]
pub struct Retryer {
    config: RetryConfig,
    attempt: u32,
    delays: Vec<Duration>,
}

impl Retryer {
    /// Create a counter positioned at attempt 1
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config, attempt: 1, delays: Vec::new() }
    }

    /// Independent counter with the same settings, reset to attempt 1
    #[must_use]
    pub const fn fresh(&self) -> Self {
        Self::new(self.config)
    }

    /// Attempt currently in progress (1-indexed)
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Settings this counter runs with
    #[must_use]
    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Delays handed out so far, in order
    #[must_use]
    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Consume the counter and return the delays handed out
    #[must_use]
    pub fn into_delays(self) -> Vec<Duration> {
        self.delays
    }

    /// Decide what to do after the current attempt failed retryably.
    ///
    /// On `Continue` the counter advances to the next attempt.
    pub fn on_retryable_failure(&mut self) -> RetryDecision {
        self.on_retryable_failure_after(None)
    }

    /// Like [`on_retryable_failure`](Self::on_retryable_failure), with a
    /// delay requested by the remote party.
    ///
    /// A requested delay replaces the computed backoff, still capped at
    /// `max_delay`.
    pub fn on_retryable_failure_after(&mut self, requested: Option<Duration>) -> RetryDecision {
        let max_attempts = self.config.max_attempts;
        if self.attempt >= max_attempts {
            error!(
                attempts = self.attempt,
                max_attempts, "Giving up after {} attempts", self.attempt
            );
            return RetryDecision::GiveUp;
        }

        let delay = requested.map_or_else(
            || self.config.delay_for_attempt(self.attempt),
            |requested| requested.min(self.config.max_delay),
        );
        warn!(
            attempt = self.attempt,
            max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Sleeping {:?} before attempt {}/{}",
            delay,
            self.attempt + 1,
            max_attempts
        );
        self.attempt += 1;
        self.delays.push(delay);
        RetryDecision::Continue(delay)
    }

    /// Decide and, when continuing, sleep for the backoff delay.
    ///
    /// Returns `true` when another attempt should be made.
    pub async fn backoff(&mut self) -> bool {
        self.backoff_after(None).await
    }

    /// Like [`backoff`](Self::backoff), honoring a requested delay.
    pub async fn backoff_after(&mut self, requested: Option<Duration>) -> bool {
        match self.on_retryable_failure_after(requested) {
            RetryDecision::Continue(delay) => {
                tokio::time::sleep(delay).await;
                true
            }
            RetryDecision::GiveUp => false,
        }
    }
}

/// Outcome of a retry execution including attempt statistics
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: RetryResult<T, E>,
    pub attempts: u32,
    pub delays: Vec<Duration>,
}

impl<T, E> RetryOutcome<T, E> {
    /// Consume the outcome and return only the result.
    pub fn into_result(self) -> RetryResult<T, E> {
        self.result
    }

    /// Sum of all delays slept between attempts
    #[must_use]
    pub fn total_delay(&self) -> Duration {
        self.delays.iter().sum()
    }
}

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// Return true when another attempt may succeed
    fn should_retry(&self, error: &E) -> bool;
}

/// Runs async operations under a [`RetryConfig`] and a [`RetryPolicy`]
#[derive(Debug, Clone)]
pub struct RetryExecutor<P> {
    config: RetryConfig,
    policy: P,
}

impl<P> RetryExecutor<P> {
    /// Create a new retry executor with the given configuration and policy
    pub const fn new(config: RetryConfig, policy: P) -> Self {
        Self { config, policy }
    }

    /// Settings used for every execution
    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation with retry logic
    ///
    /// # Errors
    /// Returns `RetryError::NonRetryable` for errors the policy rejects and
    /// `RetryError::AttemptsExhausted` once `max_attempts` is reached.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_outcome(operation).await.into_result()
    }

    /// Execute an operation with retry logic and return outcome statistics.
    #[instrument(skip(self, operation), fields(max_attempts = self.config.max_attempts))]
    pub async fn execute_with_outcome<F, Fut, T, E>(&self, mut operation: F) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut retryer = self.config.retryer();

        loop {
            let attempt = retryer.attempt();
            debug!("Executing operation (attempt {}/{})", attempt, self.config.max_attempts);

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("Operation succeeded after {} retries", attempt - 1);
                    }
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt,
                        delays: retryer.into_delays(),
                    };
                }
                Err(err) => {
                    if !self.policy.should_retry(&err) {
                        debug!(error = %err, "Retry policy determined not to retry");
                        return RetryOutcome {
                            result: Err(RetryError::NonRetryable { source: err }),
                            attempts: attempt,
                            delays: retryer.into_delays(),
                        };
                    }

                    if !retryer.backoff().await {
                        return RetryOutcome {
                            result: Err(RetryError::AttemptsExhausted {
                                attempts: attempt,
                                last_error: err,
                            }),
                            attempts: attempt,
                            delays: retryer.into_delays(),
                        };
                    }
                }
            }
        }
    }
}

/// Pre-defined retry policies
pub mod policies {
    use super::{ErrorClassification, RetryPolicy};

    /// Retries on any error
    #[derive(Debug, Clone, Copy, Default)]
    pub struct AlwaysRetry;

    impl<E> RetryPolicy<E> for AlwaysRetry {
        fn should_retry(&self, _error: &E) -> bool {
            true
        }
    }

    /// Retries errors that classify themselves as retryable
    #[derive(Debug, Clone, Copy, Default)]
    pub struct Classified;

    impl<E: ErrorClassification> RetryPolicy<E> for Classified {
        fn should_retry(&self, error: &E) -> bool {
            error.is_retryable()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::policies::{AlwaysRetry, Classified};
    use super::*;
    use crate::error::CommonError;

    fn config(initial_ms: u64, max_ms: u64, attempts: u32) -> RetryConfig {
        RetryConfig::new(Duration::from_millis(initial_ms), Duration::from_millis(max_ms), attempts)
            .unwrap()
    }

    /// Validates the 1.5x growth of delays and the cap at `max_delay`.
    ///
    /// Assertions:
    /// - Attempt 1 waits exactly the initial delay.
    /// - Attempts 2..4 grow by 1.5 each (150, 225, 337 ms, truncated).
    /// - Large attempt numbers saturate at `max_delay`.
    #[test]
    fn test_delay_grows_by_one_and_a_half() {
        let config = config(100, 1_000, 10);

        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(150));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(225));
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(337));
        assert_eq!(config.delay_for_attempt(7), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(u32::MAX), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
    }

    #[test]
    fn test_requested_delay_replaces_backoff() {
        let mut retryer = config(100, 1_000, 4).retryer();

        assert_eq!(
            retryer.on_retryable_failure_after(Some(Duration::from_millis(400))),
            RetryDecision::Continue(Duration::from_millis(400))
        );
        assert_eq!(
            retryer.on_retryable_failure_after(Some(Duration::from_secs(30))),
            RetryDecision::Continue(Duration::from_secs(1))
        );
        // without a request the formula resumes at the current attempt
        assert_eq!(
            retryer.on_retryable_failure(),
            RetryDecision::Continue(Duration::from_millis(225))
        );
        assert_eq!(retryer.on_retryable_failure_after(Some(Duration::ZERO)), RetryDecision::GiveUp);
    }

    #[test]
    fn test_sub_millisecond_delays_truncate() {
        let config = RetryConfig::new(Duration::from_micros(1_500), Duration::from_millis(10), 3)
            .unwrap();
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(1));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(1));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(2));

        let config = RetryConfig::new(Duration::from_micros(900), Duration::from_millis(10), 3)
            .unwrap();
        assert_eq!(config.delay_for_attempt(1), Duration::ZERO);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = RetryConfig::builder()
            .initial_delay(Duration::from_secs(2))
            .max_delay(Duration::from_secs(1))
            .build();
        assert!(matches!(result, Err(RetryError::InvalidConfiguration { .. })));
    }

    /// Validates the attempt counter state machine.
    ///
    /// Assertions:
    /// - Counter starts at 1 and advances on every `Continue`.
    /// - `GiveUp` is returned once the counter reaches `max_attempts`.
    /// - Recorded delays match the backoff formula.
    #[test]
    fn test_retryer_gives_up_at_max_attempts() {
        let mut retryer = config(10, 1_000, 3).retryer();
        assert_eq!(retryer.attempt(), 1);

        assert_eq!(retryer.on_retryable_failure(), RetryDecision::Continue(Duration::from_millis(10)));
        assert_eq!(retryer.attempt(), 2);
        assert_eq!(retryer.on_retryable_failure(), RetryDecision::Continue(Duration::from_millis(15)));
        assert_eq!(retryer.attempt(), 3);
        assert_eq!(retryer.on_retryable_failure(), RetryDecision::GiveUp);
        assert_eq!(retryer.attempt(), 3);
        assert_eq!(retryer.delays(), &[Duration::from_millis(10), Duration::from_millis(15)]);
    }

    #[test]
    fn test_zero_and_one_attempts_never_retry() {
        for attempts in [0, 1] {
            let mut retryer = config(10, 10, attempts).retryer();
            assert_eq!(retryer.on_retryable_failure(), RetryDecision::GiveUp);
        }
        assert_eq!(RetryConfig::no_retry().retryer().on_retryable_failure(), RetryDecision::GiveUp);
    }

    /// Validates that duplicated counters are independent.
    ///
    /// Assertions:
    /// - `fresh()` starts at attempt 1 even if the source has advanced.
    /// - Advancing the copy does not move the source.
    #[test]
    fn test_fresh_counter_is_independent() {
        let mut first = config(10, 100, 5).retryer();
        first.on_retryable_failure();
        first.on_retryable_failure();
        assert_eq!(first.attempt(), 3);

        let mut second = first.fresh();
        assert_eq!(second.attempt(), 1);
        assert!(second.delays().is_empty());

        second.on_retryable_failure();
        assert_eq!(second.attempt(), 2);
        assert_eq!(first.attempt(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_executor_succeeds_after_retries() {
        let executor = RetryExecutor::new(config(100, 1_000, 3), AlwaysRetry);
        let calls = Arc::new(AtomicU32::new(0));

        let outcome = executor
            .execute_with_outcome(|| {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("transient")
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(*outcome.result.as_ref().unwrap(), 42);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.delays, vec![Duration::from_millis(100), Duration::from_millis(150)]);
        assert_eq!(outcome.total_delay(), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_executor_exhausts_attempts() {
        let executor = RetryExecutor::new(config(5, 50, 4), AlwaysRetry);
        let calls = Arc::new(AtomicU32::new(0));

        let result: RetryResult<(), &str> = executor
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("down")
                }
            })
            .await;

        assert!(matches!(result, Err(RetryError::AttemptsExhausted { attempts: 4, last_error: "down" })));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_classified_policy_stops_on_permanent_errors() {
        let executor = RetryExecutor::new(config(1, 1, 5), Classified);
        let calls = Arc::new(AtomicU32::new(0));

        let result: RetryResult<(), CommonError> = executor
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(CommonError::backend_permanent("idp", "invalid_client"))
                }
            })
            .await;

        assert!(matches!(result, Err(RetryError::NonRetryable { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
