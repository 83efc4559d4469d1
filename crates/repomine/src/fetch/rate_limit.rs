use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::clock::{Clock, Sleeper};
use crate::api::{
    ApiClient, ApiError, FailureKind, ListPage, PageRequest, Query, RateLimitStatus,
};

/// Lower bound on the margin added after a reset instant.
pub const MIN_SAFETY_MARGIN: Duration = Duration::from_secs(2);

/// Wait used when no reset instant is available at all.
pub const DEFAULT_FALLBACK_WAIT: Duration = Duration::from_secs(600);

/// The last quota state observed from the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaSnapshot {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub reset_at: Option<DateTime<Utc>>,
}

/// Result of [`RateLimitedClient::wait_for_reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaWait {
    /// How long the wait slept.
    pub waited: Duration,
    /// Requests left according to a live status query made during the wait.
    pub live_remaining: Option<u64>,
}

impl QuotaWait {
    /// Whether the live quota showed requests left, i.e. the rejection that
    /// caused the wait was not about the quota.
    pub fn quota_available(&self) -> bool {
        self.live_remaining.is_some_and(|left| left > 0)
    }
}

/// Quota-aware wrapper around an [`ApiClient`].
///
/// Knows how much quota remains and when it resets, and owns the "sleep
/// until reset" policy. It also implements [`ApiClient`] itself so the
/// collectors can be handed the wrapped client directly; quota errors seen
/// in passing are folded into the snapshot.
///
/// Waits are serialized: a second caller blocks on the first caller's
/// check-and-wait instead of starting its own sleep.
pub struct RateLimitedClient {
    inner: Arc<dyn ApiClient>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    safety_margin: Duration,
    fallback_wait: Duration,
    wait_lock: tokio::sync::Mutex<()>,
    snapshot: Mutex<QuotaSnapshot>,
}

impl RateLimitedClient {
    pub fn new(inner: Arc<dyn ApiClient>, clock: Arc<dyn Clock>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            inner,
            clock,
            sleeper,
            safety_margin: MIN_SAFETY_MARGIN,
            fallback_wait: DEFAULT_FALLBACK_WAIT,
            wait_lock: tokio::sync::Mutex::new(()),
            snapshot: Mutex::new(QuotaSnapshot::default()),
        }
    }

    /// Set the margin added after the reset instant (never below 2 s).
    #[must_use]
    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin.max(MIN_SAFETY_MARGIN);
        self
    }

    /// Set the wait used when the reset instant is unknown.
    #[must_use]
    pub fn with_fallback_wait(mut self, wait: Duration) -> Self {
        self.fallback_wait = wait;
        self
    }

    pub fn safety_margin(&self) -> Duration {
        self.safety_margin
    }

    /// The wrapped client.
    pub fn inner(&self) -> &Arc<dyn ApiClient> {
        &self.inner
    }

    /// Query the live quota status and record it.
    pub async fn status(&self) -> Result<RateLimitStatus, ApiError> {
        let status = self.inner.rate_limit().await?;
        tracing::trace!(
            remaining = status.remaining,
            limit = status.limit,
            reset_at = %status.reset_at,
            "Quota status"
        );
        self.record(QuotaSnapshot {
            limit: Some(status.limit),
            remaining: Some(status.remaining),
            reset_at: Some(status.reset_at),
        });
        Ok(status)
    }

    /// Requests left in the current window, queried live.
    pub async fn remaining(&self) -> Result<u64, ApiError> {
        Ok(self.status().await?.remaining)
    }

    /// Time to sleep so that `reset_at` has passed by the safety margin.
    pub fn wait_duration(&self, reset_at: DateTime<Utc>) -> Duration {
        let until_reset = (reset_at - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        until_reset + self.safety_margin
    }

    /// Sleep until the quota resets if fewer than `min_required` requests
    /// remain. Returns how long it slept.
    pub async fn wait_for_capacity(&self, min_required: u64) -> Result<Duration, ApiError> {
        let _guard = self.wait_lock.lock().await;

        let status = self.status().await?;
        if status.remaining >= min_required {
            return Ok(Duration::ZERO);
        }

        let wait = self.wait_duration(status.reset_at);
        tracing::warn!(
            remaining = status.remaining,
            min_required,
            reset_at = %status.reset_at,
            wait_secs = wait.as_secs(),
            "Quota low, waiting for reset"
        );
        self.sleeper.sleep(wait).await;
        Ok(wait)
    }

    /// Sleep after a request was rejected for quota.
    ///
    /// The reset instant comes from `hint` (reported alongside the error),
    /// else from a live status query, else the fixed fallback wait is used.
    /// When the live query shows requests left, the rejection was not about
    /// the quota: only the safety margin is slept and the returned
    /// [`QuotaWait`] says so.
    pub async fn wait_for_reset(&self, hint: Option<DateTime<Utc>>) -> QuotaWait {
        let _guard = self.wait_lock.lock().await;

        let live = match hint {
            Some(_) => None,
            None => match self.status().await {
                Ok(status) => Some(status),
                Err(e) => {
                    tracing::debug!(error = %e, "Could not read quota status");
                    None
                }
            },
        };

        if let Some(status) = live
            && status.remaining > 0
        {
            let wait = self.safety_margin;
            tracing::warn!(
                remaining = status.remaining,
                wait_secs = wait.as_secs(),
                "Rejected with quota left, not waiting for reset"
            );
            self.sleeper.sleep(wait).await;
            return QuotaWait {
                waited: wait,
                live_remaining: Some(status.remaining),
            };
        }

        let reset_at = hint.or(live.map(|s| s.reset_at));
        let wait = match reset_at {
            Some(reset_at) => {
                self.update(|s| {
                    s.remaining = Some(0);
                    s.reset_at = Some(reset_at);
                });
                self.wait_duration(reset_at)
            }
            None => self.fallback_wait,
        };

        tracing::warn!(
            reset_at = ?reset_at,
            wait_secs = wait.as_secs(),
            "Quota exhausted, sleeping until reset"
        );
        self.sleeper.sleep(wait).await;
        QuotaWait {
            waited: wait,
            live_remaining: live.map(|s| s.remaining),
        }
    }

    /// The last observed quota state.
    pub fn snapshot(&self) -> QuotaSnapshot {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, snapshot: QuotaSnapshot) {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    fn update(&self, f: impl FnOnce(&mut QuotaSnapshot)) {
        f(&mut self.snapshot.lock().unwrap_or_else(PoisonError::into_inner));
    }

    fn observe<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(e) = &result
            && e.kind() == FailureKind::QuotaExhausted
        {
            let hint = e.reset_hint();
            self.update(|s| {
                s.remaining = Some(0);
                if hint.is_some() {
                    s.reset_at = hint;
                }
            });
        }
        result
    }
}

#[async_trait]
impl ApiClient for RateLimitedClient {
    async fn list_page(
        &self,
        route: &str,
        query: &Query,
        page: PageRequest,
    ) -> Result<ListPage<Value>, ApiError> {
        self.observe(self.inner.list_page(route, query, page).await)
    }

    async fn get(&self, route: &str, query: &Query) -> Result<Value, ApiError> {
        self.observe(self.inner.get(route, query).await)
    }

    async fn rate_limit(&self) -> Result<RateLimitStatus, ApiError> {
        self.status().await
    }
}
