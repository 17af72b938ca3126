//! Single-slot credential cache with pre-emptive background refresh
//!
//! Manages one credential for one header:
//! - Cache hits return immediately without touching any async lock
//! - A miss (empty or expired slot) loads synchronously through the retry
//!   engine; concurrent misses share a single load
//! - After every successful load at most one background refresh is
//!   scheduled, according to the [`RefreshAhead`] policy
//! - Failed loads never surface to callers: the previous credential keeps
//!   being served until it expires and the alert sink is notified

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::schedule::{plan_refresh, RefreshAhead, RefreshPlan};
use super::traits::{
    AlertSink, CredentialRefreshFailure, CredentialSource, RefreshFailureReason, TracingAlertSink,
};
use super::types::{Credential, CredentialError};
use crate::error::CommonError;
use crate::resilience::retry::{policies, RetryConfig, RetryError, RetryExecutor};
use crate::time::{Clock, SystemClock};

/// Tunables for a [`CredentialCache`]
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Retry policy applied to every load
    pub retry: RetryConfig,
    /// When to reload ahead of expiry
    pub refresh_ahead: RefreshAhead,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { retry: RetryConfig::default(), refresh_ahead: RefreshAhead::Never }
    }
}

struct ScheduledRefresh {
    seq: u64,
    at: DateTime<Utc>,
    handle: JoinHandle<()>,
}

struct Inner {
    header_name: String,
    source: Arc<dyn CredentialSource>,
    alerts: Arc<dyn AlertSink>,
    clock: Arc<dyn Clock>,
    settings: CacheSettings,
    slot: RwLock<Option<Credential>>,
    load_lock: tokio::sync::Mutex<()>,
    // bumped after every completed load, successful or not
    loads: AtomicU64,
    schedule_seq: AtomicU64,
    pending: Mutex<Option<ScheduledRefresh>>,
}

/// Credential cache for one header
///
/// Cheap to clone; clones share the same slot and background task.
#[derive(Clone)]
pub struct CredentialCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CredentialCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCache")
            .field("header_name", &self.inner.header_name)
            .field("settings", &self.inner.settings)
            .field("cached", &self.inner.slot.read().is_some())
            .finish_non_exhaustive()
    }
}

impl CredentialCache {
    /// Create a cache that alerts through tracing and uses the system clock
    ///
    /// # Arguments
    /// * `header_name` - Header the credential is rendered into
    /// * `source` - Producer of fresh credentials
    /// * `settings` - Retry and refresh-ahead settings
    pub fn new(
        header_name: impl Into<String>,
        source: Arc<dyn CredentialSource>,
        settings: CacheSettings,
    ) -> Self {
        Self::with_collaborators(
            header_name,
            source,
            Arc::new(TracingAlertSink),
            Arc::new(SystemClock),
            settings,
        )
    }

    /// Create a cache with explicit alert sink and clock
    pub fn with_collaborators(
        header_name: impl Into<String>,
        source: Arc<dyn CredentialSource>,
        alerts: Arc<dyn AlertSink>,
        clock: Arc<dyn Clock>,
        settings: CacheSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                header_name: header_name.into(),
                source,
                alerts,
                clock,
                settings,
                slot: RwLock::new(None),
                load_lock: tokio::sync::Mutex::new(()),
                loads: AtomicU64::new(0),
                schedule_seq: AtomicU64::new(0),
                pending: Mutex::new(None),
            }),
        }
    }

    /// Header the credential is rendered into
    #[must_use]
    pub fn header_name(&self) -> &str {
        &self.inner.header_name
    }

    /// Header value for the next outgoing call
    ///
    /// Returns `""` when no usable credential could be obtained.
    pub async fn header_value(&self) -> String {
        self.get().await.map(|credential| credential.header_value()).unwrap_or_default()
    }

    /// Get the cached credential, loading it on a miss
    ///
    /// Concurrent callers that miss together trigger one load and all
    /// observe its result.
    pub async fn get(&self) -> Option<Credential> {
        let observed = self.inner.loads.load(Ordering::Acquire);
        if let Some(credential) = self.inner.fresh() {
            return Some(credential);
        }

        let _guard = self.inner.load_lock.lock().await;
        if self.inner.loads.load(Ordering::Acquire) != observed {
            debug!(header = %self.inner.header_name, "Observed result of concurrent load");
            return self.inner.fresh();
        }

        Inner::load(&self.inner).await
    }

    /// Force a reload
    ///
    /// The cached credential is replaced only if the load succeeds.
    pub async fn refresh(&self) -> Option<Credential> {
        let _guard = self.inner.load_lock.lock().await;
        Inner::load(&self.inner).await
    }

    /// Peek at the slot without loading, expired or not
    #[must_use]
    pub fn current(&self) -> Option<Credential> {
        self.inner.slot.read().clone()
    }

    /// Instant of the pending background refresh, if one is scheduled
    #[must_use]
    pub fn scheduled_refresh_at(&self) -> Option<DateTime<Utc>> {
        self.inner.pending.lock().as_ref().map(|pending| pending.at)
    }

    /// Cancel the pending background refresh
    pub fn shutdown(&self) {
        if let Some(pending) = self.inner.pending.lock().take() {
            pending.handle.abort();
            debug!(header = %self.inner.header_name, "Background refresh cancelled");
        }
    }
}

impl Inner {
    fn fresh(&self) -> Option<Credential> {
        let now = self.clock.now();
        self.slot.read().as_ref().filter(|credential| !credential.is_expired_at(now)).cloned()
    }

    /// Load through the retry engine. Caller holds `load_lock`.
    #[instrument(skip(this), fields(header = %this.header_name))]
    async fn load(this: &Arc<Self>) -> Option<Credential> {
        let executor = RetryExecutor::new(this.settings.retry, policies::Classified);
        let source = &this.source;
        let outcome = executor.execute_with_outcome(move || source.obtain_fresh_credential()).await;
        let attempts = outcome.attempts;

        let failure = match outcome.result {
            Ok(Some(credential)) => {
                info!(attempts, "Credential refreshed");
                *this.slot.write() = Some(credential.clone());
                Self::schedule_after_load(this, credential.expires_at());
                None
            }
            Ok(None) => Some(RefreshFailureReason::Empty),
            Err(RetryError::AttemptsExhausted { last_error, .. }) => {
                Some(RefreshFailureReason::Exhausted(last_error))
            }
            Err(RetryError::NonRetryable { source }) => {
                Some(RefreshFailureReason::NonRetryable(source))
            }
            Err(RetryError::InvalidConfiguration { message }) => Some(
                RefreshFailureReason::NonRetryable(CredentialError::Common(CommonError::config(
                    message,
                ))),
            ),
        };

        if let Some(reason) = failure {
            let failure =
                CredentialRefreshFailure { header_name: this.header_name.clone(), attempts, reason };
            warn!(attempts, "Credential refresh failed, keeping previous credential: {failure}");
            this.alerts.send_alert(&failure);
        }

        this.loads.fetch_add(1, Ordering::Release);
        this.fresh()
    }

    fn schedule_after_load(this: &Arc<Self>, expires_at: Option<DateTime<Utc>>) {
        // Held until the new entry is stored, so the task cannot fire first.
        let mut pending = this.pending.lock();

        // a new load always supersedes the previous schedule
        if let Some(previous) = pending.take() {
            previous.handle.abort();
        }

        let plan = plan_refresh(this.clock.now(), expires_at, &this.settings.refresh_ahead);
        plan.log(&this.header_name);
        let RefreshPlan::Scheduled { at, delay } = plan else {
            return;
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(header = %this.header_name, "No async runtime available, background refresh skipped");
            return;
        };

        let seq = this.schedule_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let weak = Arc::downgrade(this);
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            Self::run_scheduled(&weak, seq).await;
        });
        *pending = Some(ScheduledRefresh { seq, at, handle });
    }

    async fn run_scheduled(weak: &Weak<Self>, seq: u64) {
        let Some(this) = weak.upgrade() else {
            return;
        };

        let observed = this.loads.load(Ordering::Acquire);

        // Detach from the slot so the reload below does not abort this task.
        {
            let mut pending = this.pending.lock();
            if pending.as_ref().is_some_and(|p| p.seq == seq) {
                pending.take();
            } else {
                return;
            }
        }

        let _guard = this.load_lock.lock().await;
        if this.loads.load(Ordering::Acquire) != observed {
            // a load completed while this task waited
            debug!(header = %this.header_name, "Background refresh superseded by concurrent load");
            return;
        }

        info!(header = %this.header_name, "Running background credential refresh");
        Self::load(&this).await;
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.get_mut().take() {
            pending.handle.abort();
        }
    }
}
