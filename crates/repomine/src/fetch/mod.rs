//! The retrieval engine: quota handling, pagination and retries.
//!
//! Calls flow one way: [`RetryingFetcher`] drives an operation that pages
//! through [`Paginator`], which issues requests through
//! [`RateLimitedClient`] to the underlying [`ApiClient`](crate::api::ApiClient).
//!
//! ```ignore
//! let limiter = Arc::new(RateLimitedClient::new(api, clock, sleeper.clone()));
//! let fetcher = RetryingFetcher::new(limiter.clone(), sleeper, RetryPolicy::default());
//!
//! let outcome = fetcher
//!     .fetch("octocat/hello-world", || {
//!         Paginator::default().fetch_route(limiter.as_ref(), "/repos/octocat/hello-world/commits", &Query::new())
//!     })
//!     .await?;
//! ```

mod clock;
mod outcome;
mod paginator;
mod rate_limit;
mod retry;

pub use clock::{Clock, Sleeper, SystemClock, TokioSleeper};
pub use outcome::{FetchError, FetchOutcome};
pub use paginator::{DEFAULT_PER_PAGE, Paginator};
pub use rate_limit::{
    DEFAULT_FALLBACK_WAIT, MIN_SAFETY_MARGIN, QuotaSnapshot, QuotaWait, RateLimitedClient,
};
pub use retry::{DEFAULT_TRANSIENT_BUDGET, DEFAULT_TRANSIENT_DELAY, RetryPolicy, RetryingFetcher};
