//! Integration tests for the credential refresh cache
//!
//! Covers single-flight loading, failure masking with alerts, and the
//! background refresh-ahead task.

#![cfg(feature = "test-utils")]

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use futures::future::join_all;
use outcall_common::auth::{
    CacheSettings, Credential, CredentialCache, CredentialError, RefreshAhead,
    RefreshFailureReason,
};
use outcall_common::error::CommonError;
use outcall_common::resilience::RetryConfig;
use outcall_common::testing::{MockClock, MockCredentialSource, RecordingAlertSink};
use outcall_common::time::Clock;

fn settings(attempts: u32, refresh_ahead: RefreshAhead) -> CacheSettings {
    CacheSettings {
        retry: RetryConfig::new(Duration::from_millis(10), Duration::from_millis(20), attempts)
            .expect("valid retry config"),
        refresh_ahead,
    }
}

fn cache(
    source: &MockCredentialSource,
    alerts: &RecordingAlertSink,
    clock: &MockClock,
    settings: CacheSettings,
) -> CredentialCache {
    CredentialCache::with_collaborators(
        "Authorization",
        Arc::new(source.clone()),
        Arc::new(alerts.clone()),
        Arc::new(clock.clone()),
        settings,
    )
}

/// Validates at-most-one-concurrent-refresh.
///
/// # Test Steps
/// 1. Make the source slow so all callers miss while the load is in flight
/// 2. Fire 16 concurrent `header_value` calls
/// 3. Verify the source ran once and every caller saw the same value
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_share_one_load() {
    let clock = MockClock::new();
    let source = MockCredentialSource::always(Credential::bearer("shared", clock.now(), Some(3600)));
    source.set_latency(Duration::from_millis(50));
    let alerts = RecordingAlertSink::new();
    let cache = cache(&source, &alerts, &clock, settings(3, RefreshAhead::Never));

    let tasks = (0..16).map(|_| {
        let cache = cache.clone();
        tokio::spawn(async move { cache.header_value().await })
    });

    for value in join_all(tasks).await {
        assert_eq!(value.expect("task panicked"), "Bearer shared");
    }
    assert_eq!(source.calls(), 1);
    assert!(alerts.alerts().is_empty());
}

/// Validates that concurrent misses also share an empty result.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_share_absence() {
    let clock = MockClock::new();
    let source = MockCredentialSource::new();
    source.set_latency(Duration::from_millis(50));
    let alerts = RecordingAlertSink::new();
    let cache = cache(&source, &alerts, &clock, settings(1, RefreshAhead::Never));

    let tasks = (0..8).map(|_| {
        let cache = cache.clone();
        tokio::spawn(async move { cache.header_value().await })
    });

    for value in join_all(tasks).await {
        assert_eq!(value.expect("task panicked"), "");
    }
    assert_eq!(source.calls(), 1);
    assert_eq!(alerts.alerts().len(), 1);
    assert_eq!(alerts.alerts()[0].reason, RefreshFailureReason::Empty);
}

/// Validates that a failed refresh keeps serving the previous credential
/// and alerts only after retries are exhausted.
///
/// # Test Steps
/// 1. Load a valid credential
/// 2. Force a refresh against a source that keeps failing retryably
/// 3. Verify the old credential is still served and one alert was raised
#[tokio::test(start_paused = true)]
async fn test_failed_refresh_keeps_previous_credential() {
    let clock = MockClock::new();
    let source = MockCredentialSource::new();
    source.push(Ok(Some(Credential::bearer("first", clock.now(), Some(3600)))));
    source.set_fallback(Err(CredentialError::Common(CommonError::backend_retryable(
        "idp",
        "connection reset",
    ))));
    let alerts = RecordingAlertSink::new();
    let cache = cache(&source, &alerts, &clock, settings(3, RefreshAhead::Never));

    assert_eq!(cache.header_value().await, "Bearer first");

    let refreshed = cache.refresh().await;
    assert_eq!(refreshed.map(|c| c.header_value()).as_deref(), Some("Bearer first"));
    assert_eq!(cache.header_value().await, "Bearer first");

    assert_eq!(source.calls(), 4);
    let recorded = alerts.alerts();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].attempts, 3);
    assert!(matches!(recorded[0].reason, RefreshFailureReason::Exhausted(_)));
}

/// Validates that an expired credential is never served, even when the
/// reload fails.
#[tokio::test]
async fn test_expired_credential_not_served_after_failed_reload() {
    let clock = MockClock::new();
    let source = MockCredentialSource::new();
    source.push(Ok(Some(Credential::bearer("short-lived", clock.now(), Some(60)))));
    source.set_fallback(Err(CredentialError::Http { status: 401, message: "revoked".into() }));
    let alerts = RecordingAlertSink::new();
    let cache = cache(&source, &alerts, &clock, settings(3, RefreshAhead::Never));

    assert_eq!(cache.header_value().await, "Bearer short-lived");
    clock.advance(Duration::from_secs(61));

    assert_eq!(cache.header_value().await, "");
    // 401 is not retryable: one extra call only
    assert_eq!(source.calls(), 2);
    assert!(matches!(alerts.alerts()[0].reason, RefreshFailureReason::NonRetryable(_)));
    assert!(cache.current().is_some());
}

/// Validates the background refresh-ahead task.
///
/// # Test Steps
/// 1. Load a credential living 300 s with a 60 s refresh-ahead lead
/// 2. Advance tokio time and the mock clock past the refresh instant
/// 3. Verify the source was called again without any caller asking and the
///    new credential is served from cache
#[tokio::test(start_paused = true)]
async fn test_background_refresh_replaces_credential() {
    let clock = MockClock::new();
    let source = MockCredentialSource::new();
    source.push(Ok(Some(Credential::bearer("first", clock.now(), Some(300)))));
    source.push(Ok(Some(Credential::bearer(
        "second",
        clock.now() + ChronoDuration::seconds(240),
        Some(300),
    ))));
    let alerts = RecordingAlertSink::new();
    let cache = cache(
        &source,
        &alerts,
        &clock,
        settings(1, RefreshAhead::before_expiry(Duration::from_secs(60))),
    );

    assert_eq!(cache.header_value().await, "Bearer first");
    assert_eq!(cache.scheduled_refresh_at(), Some(clock.now() + ChronoDuration::seconds(240)));

    clock.advance(Duration::from_secs(240));
    tokio::time::sleep(Duration::from_secs(241)).await;

    assert_eq!(source.calls(), 2);
    assert_eq!(cache.header_value().await, "Bearer second");
    assert_eq!(source.calls(), 2);
    assert_eq!(cache.scheduled_refresh_at(), Some(clock.now() + ChronoDuration::seconds(240)));

    cache.shutdown();
}

/// Validates that a failed background refresh is alerted and masked.
///
/// # Test Steps
/// 1. Load a credential living 300 s with a 60 s refresh-ahead lead
/// 2. Let the scheduled refresh run against a source that keeps failing
/// 3. Verify one alert, the old credential still served and no new schedule
#[tokio::test(start_paused = true)]
async fn test_failed_background_refresh_keeps_credential() {
    let clock = MockClock::new();
    let source = MockCredentialSource::new();
    source.push(Ok(Some(Credential::bearer("first", clock.now(), Some(300)))));
    source.set_fallback(Err(CredentialError::Common(CommonError::backend_retryable(
        "idp",
        "connection reset",
    ))));
    let alerts = RecordingAlertSink::new();
    let cache = cache(
        &source,
        &alerts,
        &clock,
        settings(2, RefreshAhead::before_expiry(Duration::from_secs(60))),
    );

    assert_eq!(cache.header_value().await, "Bearer first");

    clock.advance(Duration::from_secs(240));
    tokio::time::sleep(Duration::from_secs(241)).await;

    assert_eq!(source.calls(), 3);
    let recorded = alerts.alerts();
    assert_eq!(recorded.len(), 1);
    assert!(matches!(recorded[0].reason, RefreshFailureReason::Exhausted(_)));
    assert_eq!(cache.header_value().await, "Bearer first");
    assert!(cache.scheduled_refresh_at().is_none());
    assert_eq!(source.calls(), 3);
}

/// Validates that a scheduled refresh firing during an explicit refresh does
/// not load a second time.
///
/// # Test Steps
/// 1. Load a credential living 300 s, refresh scheduled at 240 s
/// 2. Start a slow explicit refresh at 230 s that is still running at 240 s
/// 3. Verify the source ran twice in total and the new schedule stands
#[tokio::test(start_paused = true)]
async fn test_scheduled_refresh_yields_to_overlapping_load() {
    let clock = MockClock::new();
    let source = MockCredentialSource::new();
    source.push(Ok(Some(Credential::bearer("first", clock.now(), Some(300)))));
    source.push(Ok(Some(Credential::bearer(
        "second",
        clock.now() + ChronoDuration::seconds(230),
        Some(300),
    ))));
    source.set_fallback(Ok(Some(Credential::bearer(
        "third",
        clock.now() + ChronoDuration::seconds(250),
        Some(300),
    ))));
    let alerts = RecordingAlertSink::new();
    let cache = cache(
        &source,
        &alerts,
        &clock,
        settings(1, RefreshAhead::before_expiry(Duration::from_secs(60))),
    );

    assert_eq!(cache.header_value().await, "Bearer first");

    clock.advance(Duration::from_secs(230));
    tokio::time::sleep(Duration::from_secs(230)).await;
    source.set_latency(Duration::from_secs(20));

    let refreshing = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.refresh().await })
    };
    tokio::time::sleep(Duration::from_secs(30)).await;

    let refreshed = refreshing.await.expect("task panicked");
    assert_eq!(refreshed.map(|c| c.header_value()).as_deref(), Some("Bearer second"));
    assert_eq!(source.calls(), 2);
    assert_eq!(cache.header_value().await, "Bearer second");
    assert_eq!(cache.scheduled_refresh_at(), Some(clock.now() + ChronoDuration::seconds(240)));
    assert!(alerts.alerts().is_empty());

    cache.shutdown();
}

/// Validates that no refresh is scheduled for credentials without expiry.
#[tokio::test]
async fn test_eternal_credential_never_scheduled() {
    let clock = MockClock::new();
    let source = MockCredentialSource::always(Credential::eternal("ApiKey ", "k", clock.now()));
    let alerts = RecordingAlertSink::new();
    let cache = cache(
        &source,
        &alerts,
        &clock,
        settings(1, RefreshAhead::before_expiry(Duration::from_secs(1))),
    );

    assert_eq!(cache.header_value().await, "ApiKey k");
    assert!(cache.scheduled_refresh_at().is_none());
}
