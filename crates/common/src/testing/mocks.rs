//! Mock implementations of the credential collaborators

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::auth::{
    AlertSink, Credential, CredentialError, CredentialRefreshFailure, CredentialSource,
};

type Scripted = Result<Option<Credential>, CredentialError>;

/// Credential source replaying a scripted sequence of results
///
/// Once the script runs out, the fallback result (if any) is returned on
/// every further call; without a fallback the source answers `Ok(None)`.
#[derive(Debug, Clone, Default)]
pub struct MockCredentialSource {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    fallback: Arc<Mutex<Option<Scripted>>>,
    latency: Arc<Mutex<Option<Duration>>>,
    calls: Arc<AtomicU32>,
}

impl MockCredentialSource {
    /// Create a source with an empty script
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Source that always returns `credential`
    #[must_use]
    pub fn always(credential: Credential) -> Self {
        let source = Self::new();
        source.set_fallback(Ok(Some(credential)));
        source
    }

    /// Append one result to the script
    pub fn push(&self, result: Scripted) -> &Self {
        self.script.lock().push_back(result);
        self
    }

    /// Result returned once the script is exhausted
    pub fn set_fallback(&self, result: Scripted) {
        *self.fallback.lock() = Some(result);
    }

    /// Sleep this long inside every call
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    /// Number of calls made so far
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialSource for MockCredentialSource {
    async fn obtain_fresh_credential(&self) -> Result<Option<Credential>, CredentialError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let next = self.script.lock().pop_front();
        match next {
            Some(result) => result,
            None => self.fallback.lock().clone().unwrap_or(Ok(None)),
        }
    }
}

/// Alert sink that stores every alert it receives
#[derive(Debug, Clone, Default)]
pub struct RecordingAlertSink {
    alerts: Arc<Mutex<Vec<CredentialRefreshFailure>>>,
}

impl RecordingAlertSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the alerts received so far
    #[must_use]
    pub fn alerts(&self) -> Vec<CredentialRefreshFailure> {
        self.alerts.lock().clone()
    }
}

impl AlertSink for RecordingAlertSink {
    fn send_alert(&self, failure: &CredentialRefreshFailure) {
        self.alerts.lock().push(failure.clone());
    }
}
