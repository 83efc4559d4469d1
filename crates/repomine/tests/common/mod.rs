//! Shared doubles for the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use repomine::fetch::{Clock, Sleeper};
use repomine::github::DEFAULT_API_URL;
use repomine::http::{HttpError, HttpRequest, HttpResponse, HttpTransport};
use serde_json::{Value, json};

pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

/// Clock moved only by [`ManualSleeper`].
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Records sleeps and advances the clock instead of waiting.
pub struct ManualSleeper {
    clock: Arc<ManualClock>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualSleeper {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for ManualSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        let mut now = self.clock.0.lock().unwrap();
        *now += chrono::Duration::from_std(duration).unwrap();
    }
}

/// Transport answering from per-URL scripts.
///
/// Keys are the request URL without the API root. Responses are handed out
/// in order; the last one repeats. `/rate_limit` always reports a full quota
/// unless scripted.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<HttpResponse>>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, path: &str, response: HttpResponse) -> &Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn respond_json(&self, path: &str, body: Value) -> &Self {
        self.respond(path, response(200, &[], body))
    }

    /// Request paths in the order they were sent.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests sent to anything but `/rate_limit`.
    pub fn api_requests(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r != "/rate_limit")
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let path = request
            .url
            .strip_prefix(DEFAULT_API_URL)
            .unwrap_or(&request.url)
            .to_string();
        self.requests.lock().unwrap().push(path.clone());

        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(&path) {
            Some(queue) if queue.len() > 1 => Ok(queue.pop_front().unwrap()),
            Some(queue) if !queue.is_empty() => Ok(queue[0].clone()),
            _ if path == "/rate_limit" => Ok(rate_limit_response(5000, 1_900_000_000)),
            _ => Err(HttpError::NoMockResponse { url: request.url }),
        }
    }
}

pub fn response(status: u16, headers: &[(&str, &str)], body: Value) -> HttpResponse {
    HttpResponse {
        status,
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        body: serde_json::to_vec(&body).unwrap(),
    }
}

pub fn rate_limit_response(remaining: u64, reset: i64) -> HttpResponse {
    let core = json!({"limit": 5000, "used": 5000 - remaining, "remaining": remaining, "reset": reset});
    response(
        200,
        &[],
        json!({
            "resources": {"core": core, "search": core},
            "rate": core
        }),
    )
}

/// `Link` header value pointing at the last page of `path`.
pub fn link_to_last(path: &str, last: u32) -> String {
    format!("<{DEFAULT_API_URL}{path}?page={last}>; rel=\"last\"")
}
