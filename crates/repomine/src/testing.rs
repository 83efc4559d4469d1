//! In-memory doubles shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::api::{ApiClient, ApiError, ListPage, PageRequest, Query, RateLimitStatus};
use crate::fetch::{Clock, Sleeper};

/// An instant `secs` seconds after the epoch.
pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).expect("valid timestamp")
}

/// A clock that only moves when told to.
pub struct SimClock {
    now: Mutex<DateTime<Utc>>,
}

impl SimClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock");
        *now += chrono::Duration::from_std(by).expect("duration in range");
    }
}

impl Clock for SimClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

/// Records every sleep and advances the clock instead of waiting.
pub struct RecordingSleeper {
    clock: Arc<SimClock>,
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new(clock: Arc<SimClock>) -> Self {
        Self {
            clock,
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().expect("sleeper lock").clone()
    }

    pub fn total(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().expect("sleeper lock").push(duration);
        self.clock.advance(duration);
    }
}

/// Scripted [`ApiClient`].
///
/// Responses are queued per route (and per page for listings) and handed out
/// in FIFO order. An unscripted call fails with a transport error.
#[derive(Default)]
pub struct FakeApi {
    inner: Mutex<FakeApiInner>,
}

#[derive(Default)]
struct FakeApiInner {
    gets: HashMap<String, VecDeque<Result<Value, ApiError>>>,
    pages: HashMap<(String, u32), VecDeque<Result<ListPage<Value>, ApiError>>>,
    rate_limit: Option<RateLimitStatus>,
    rate_limit_error: Option<ApiError>,
    rate_limit_calls: usize,
    calls: Vec<String>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_rate_limit(self, remaining: u64, reset_at: DateTime<Utc>) -> Self {
        self.inner.lock().expect("fake lock").rate_limit = Some(RateLimitStatus {
            limit: 5000,
            remaining,
            reset_at,
        });
        self
    }

    pub fn fail_rate_limit(&self, error: ApiError) {
        self.inner.lock().expect("fake lock").rate_limit_error = Some(error);
    }

    pub fn push_get(&self, route: &str, result: Result<Value, ApiError>) {
        self.inner
            .lock()
            .expect("fake lock")
            .gets
            .entry(route.to_string())
            .or_default()
            .push_back(result);
    }

    pub fn push_page(&self, route: &str, page: u32, result: Result<ListPage<Value>, ApiError>) {
        self.inner
            .lock()
            .expect("fake lock")
            .pages
            .entry((route.to_string(), page))
            .or_default()
            .push_back(result);
    }

    /// Routes requested so far, with `#page` appended for listings.
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().expect("fake lock").calls.clone()
    }

    pub fn rate_limit_calls(&self) -> usize {
        self.inner.lock().expect("fake lock").rate_limit_calls
    }
}

#[async_trait]
impl ApiClient for FakeApi {
    async fn list_page(
        &self,
        route: &str,
        _query: &Query,
        page: PageRequest,
    ) -> Result<ListPage<Value>, ApiError> {
        let mut inner = self.inner.lock().expect("fake lock");
        inner.calls.push(format!("{route}#{}", page.page));
        inner
            .pages
            .get_mut(&(route.to_string(), page.page))
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(ApiError::transport(format!("unscripted {route} page {}", page.page))))
    }

    async fn get(&self, route: &str, _query: &Query) -> Result<Value, ApiError> {
        let mut inner = self.inner.lock().expect("fake lock");
        inner.calls.push(route.to_string());
        inner
            .gets
            .get_mut(route)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(ApiError::transport(format!("unscripted {route}"))))
    }

    async fn rate_limit(&self) -> Result<RateLimitStatus, ApiError> {
        let mut inner = self.inner.lock().expect("fake lock");
        inner.rate_limit_calls += 1;
        if let Some(error) = inner.rate_limit_error.take() {
            return Err(error);
        }
        Ok(inner.rate_limit.unwrap_or(RateLimitStatus {
            limit: 5000,
            remaining: 5000,
            reset_at: at(1_900_000_000),
        }))
    }
}

/// Build a listing page.
pub fn page(items: Vec<Value>, last_page: u32) -> ListPage<Value> {
    ListPage { items, last_page }
}
