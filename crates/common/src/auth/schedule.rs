//! Refresh-ahead planning
//!
//! [`plan_refresh`] is a pure function deciding whether, and when, a freshly
//! loaded credential should be reloaded in the background. The cache acts on
//! the returned [`RefreshPlan`] and logs it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::{info, warn};

type RefreshAtFn = dyn Fn(DateTime<Utc>) -> Option<DateTime<Utc>> + Send + Sync;

/// Policy mapping an expiry instant to an earlier refresh instant
#[derive(Clone, Default)]
pub enum RefreshAhead {
    /// Never refresh pre-emptively
    #[default]
    Never,
    /// Refresh a fixed lead time before expiry
    BeforeExpiry(Duration),
    /// Arbitrary policy function
    Custom(Arc<RefreshAtFn>),
}

impl RefreshAhead {
    /// No background refresh
    #[must_use]
    pub const fn never() -> Self {
        Self::Never
    }

    /// Refresh `lead` before the credential expires
    #[must_use]
    pub const fn before_expiry(lead: Duration) -> Self {
        Self::BeforeExpiry(lead)
    }

    /// Wrap a function computing the refresh instant from the expiry
    pub fn custom<F>(policy: F) -> Self
    where
        F: Fn(DateTime<Utc>) -> Option<DateTime<Utc>> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(policy))
    }

    /// Instant at which a credential expiring at `expires_at` should be
    /// reloaded, if at all.
    #[must_use]
    pub fn refresh_at(&self, expires_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Never => None,
            Self::BeforeExpiry(lead) => ChronoDuration::from_std(*lead)
                .ok()
                .and_then(|lead| expires_at.checked_sub_signed(lead)),
            Self::Custom(policy) => policy(expires_at),
        }
    }
}

impl fmt::Debug for RefreshAhead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => f.write_str("Never"),
            Self::BeforeExpiry(lead) => f.debug_tuple("BeforeExpiry").field(lead).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Outcome of refresh-ahead planning for one loaded credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPlan {
    /// No expiry; the credential is served forever
    Eternal,
    /// The credential was already expired when loaded
    AlreadyExpired { expires_at: DateTime<Utc> },
    /// The policy declined to refresh ahead
    NotRequested { expires_at: DateTime<Utc> },
    /// The policy picked an instant that is not in the future
    NotInFuture { refresh_at: DateTime<Utc> },
    /// The policy picked an instant at or after expiry
    NotBeforeExpiry { refresh_at: DateTime<Utc>, expires_at: DateTime<Utc> },
    /// Reload at `at`, `delay` from now
    Scheduled { at: DateTime<Utc>, delay: Duration },
}

impl RefreshPlan {
    /// Scheduled delay, if any
    #[must_use]
    pub const fn delay(&self) -> Option<Duration> {
        match self {
            Self::Scheduled { delay, .. } => Some(*delay),
            _ => None,
        }
    }

    /// Emit the log line describing this plan
    pub fn log(&self, header: &str) {
        match self {
            Self::Eternal => {
                info!(header, "Credential never expires, background refresh not scheduled");
            }
            Self::AlreadyExpired { expires_at } => {
                warn!(header, %expires_at, "Credential already expired at load time");
            }
            Self::NotRequested { expires_at } => {
                info!(header, %expires_at, "No refresh-ahead requested, serving until expiry");
            }
            Self::NotInFuture { refresh_at } => {
                warn!(header, %refresh_at, "Refresh-ahead instant is not in the future, skipping");
            }
            Self::NotBeforeExpiry { refresh_at, expires_at } => {
                warn!(
                    header,
                    %refresh_at,
                    %expires_at,
                    "Refresh-ahead instant is not before expiry, skipping"
                );
            }
            Self::Scheduled { at, delay } => {
                info!(header, refresh_at = %at, "Background refresh scheduled in {:?}", delay);
            }
        }
    }
}

/// Decide whether to schedule a background refresh.
///
/// # Arguments
/// * `now` - Current time
/// * `expires_at` - Expiry of the freshly loaded credential
/// * `policy` - Refresh-ahead policy
///
/// # Returns
/// `RefreshPlan::Scheduled` only when `now < refresh_at < expires_at`.
#[must_use]
pub fn plan_refresh(
    now: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    policy: &RefreshAhead,
) -> RefreshPlan {
    let Some(expires_at) = expires_at else {
        return RefreshPlan::Eternal;
    };
    if expires_at <= now {
        return RefreshPlan::AlreadyExpired { expires_at };
    }
    let Some(refresh_at) = policy.refresh_at(expires_at) else {
        return RefreshPlan::NotRequested { expires_at };
    };
    if refresh_at <= now {
        return RefreshPlan::NotInFuture { refresh_at };
    }
    if refresh_at >= expires_at {
        return RefreshPlan::NotBeforeExpiry { refresh_at, expires_at };
    }
    match (refresh_at - now).to_std() {
        Ok(delay) => RefreshPlan::Scheduled { at: refresh_at, delay },
        Err(_) => RefreshPlan::NotInFuture { refresh_at },
    }
}
