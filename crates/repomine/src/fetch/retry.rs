use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use backon::{BackoffBuilder, ConstantBuilder};

use super::clock::Sleeper;
use super::outcome::{FetchError, FetchOutcome};
use super::rate_limit::RateLimitedClient;
use crate::api::{ApiError, FailureKind, short_error_message};

/// Fixed wait between transient retries.
pub const DEFAULT_TRANSIENT_DELAY: Duration = Duration::from_secs(5);

/// Total time spent on transient retries before giving up on a resource.
pub const DEFAULT_TRANSIENT_BUDGET: Duration = Duration::from_secs(600);

/// Retry behaviour of a [`RetryingFetcher`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Wait between transient retries.
    pub transient_delay: Duration,
    /// Upper bound on the summed transient waits for one resource.
    pub transient_budget: Duration,
    /// Check the quota before every attempt and wait for a reset when fewer
    /// requests than this remain. `None` skips the check.
    pub min_quota: Option<u64>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            transient_delay: DEFAULT_TRANSIENT_DELAY,
            transient_budget: DEFAULT_TRANSIENT_BUDGET,
            min_quota: Some(1),
        }
    }
}

impl RetryPolicy {
    /// Number of transient retries that fit in the budget.
    pub fn max_transient_retries(&self) -> usize {
        let delay = self.transient_delay.as_millis().max(1);
        (self.transient_budget.as_millis() / delay) as usize
    }

    /// Constant backoff schedule for transient failures.
    #[must_use]
    pub fn transient_backoff(&self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.transient_delay)
            .with_max_times(self.max_transient_retries())
    }
}

/// Runs one logical fetch to a terminal outcome.
///
/// - `NotFound` and `Skipped` return at once, without sleeping.
/// - `RateLimited` sleeps until the quota resets and tries again, with no
///   attempt limit (the wait is bounded by the reset instant). Once a quota
///   wait finds requests left on the live quota, further quota rejections
///   of the same resource are retried as transient failures instead.
/// - `TransientError` sleeps a fixed interval and tries again until the
///   transient budget is spent, then escalates to [`FetchError::Fatal`].
///
/// Every attempt restarts the operation from scratch; partial results of a
/// failed attempt are dropped.
pub struct RetryingFetcher {
    limiter: Arc<RateLimitedClient>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    pub fn new(limiter: Arc<RateLimitedClient>, sleeper: Arc<dyn Sleeper>, policy: RetryPolicy) -> Self {
        Self {
            limiter,
            sleeper,
            policy,
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimitedClient> {
        &self.limiter
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch `resource` with `operation`, retrying as classified.
    ///
    /// The returned outcome is always terminal.
    pub async fn fetch<T, F, Fut>(
        &self,
        resource: &str,
        mut operation: F,
    ) -> Result<FetchOutcome<T>, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut transient = self.policy.transient_backoff().build();
        let mut attempts: u32 = 0;
        let mut quota_disputed = false;

        loop {
            attempts += 1;

            let result = match self.ensure_capacity().await {
                Ok(()) => operation().await,
                Err(e) => Err(e),
            };

            let outcome = match result {
                Err(e) if quota_disputed && e.kind() == FailureKind::QuotaExhausted => {
                    FetchOutcome::TransientError(e)
                }
                other => FetchOutcome::classify(other),
            };

            match outcome {
                FetchOutcome::RateLimited(hint) => {
                    let wait = self.limiter.wait_for_reset(hint).await;
                    quota_disputed = wait.quota_available();
                    tracing::info!(
                        resource,
                        attempt = attempts,
                        waited_secs = wait.waited.as_secs(),
                        "Retrying after quota reset"
                    );
                }
                FetchOutcome::TransientError(cause) => match transient.next() {
                    Some(delay) => {
                        tracing::warn!(
                            resource,
                            attempt = attempts,
                            retry_after_ms = delay.as_millis() as u64,
                            error = %short_error_message(&cause),
                            "Transient failure, retrying"
                        );
                        self.sleeper.sleep(delay).await;
                    }
                    None => {
                        return Err(FetchError::Fatal {
                            resource: resource.to_string(),
                            attempts,
                            cause,
                        });
                    }
                },
                FetchOutcome::NotFound => {
                    tracing::debug!(resource, "Resource not found");
                    return Ok(FetchOutcome::NotFound);
                }
                terminal => return Ok(terminal),
            }
        }
    }

    async fn ensure_capacity(&self) -> Result<(), ApiError> {
        if let Some(min) = self.policy.min_quota {
            self.limiter.wait_for_capacity(min).await?;
        }
        Ok(())
    }
}
