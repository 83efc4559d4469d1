//! Repomine - rate-limit aware metadata collection for research software.
//!
//! Given a list of GitHub repositories (or users), repomine fetches one
//! variable type per run (contributors, languages, notebooks, commits,
//! readmes, topics, FAIR signals, owners) and appends flat, dated rows to a
//! CSV table. Quota exhaustion, transient failures and missing resources are
//! handled per resource, so a long run keeps going and a crashed run loses at
//! most the resource in flight.
//!
//! # Features
//!
//! - `github` (default) - the reqwest-backed HTTP transport used by
//!   [`GitHubClient::new`]. Without it, supply your own
//!   [`HttpTransport`](http::HttpTransport).
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use repomine::{
//!     BatchOptions, BatchRunner, CsvSink, GitHubClient, RateLimitedClient, RetryPolicy,
//!     RetryingFetcher, SystemClock, TokioSleeper, variables::TopicsCollector,
//! };
//!
//! let api = Arc::new(GitHubClient::new(token)?);
//! let clock = Arc::new(SystemClock);
//! let sleeper = Arc::new(TokioSleeper);
//! let limiter = Arc::new(RateLimitedClient::new(api, clock.clone(), sleeper.clone()));
//! let fetcher = Arc::new(RetryingFetcher::new(limiter.clone(), sleeper.clone(), RetryPolicy::default()));
//! let runner = BatchRunner::new(fetcher, clock, sleeper, BatchOptions::default());
//!
//! let repos = repomine::input::read_repositories("repositories.csv")?;
//! let mut sink = CsvSink::new("data/topics.csv");
//! let report = runner.run(&TopicsCollector::new(limiter), &repos, &mut sink, None).await?;
//! ```

pub mod api;
pub mod batch;
pub mod fetch;
pub mod github;
pub mod http;
pub mod input;
pub mod record;
pub mod resource;
pub mod sink;
pub mod table;
pub mod variables;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, ApiError, FailureKind, RateLimitStatus};
pub use batch::{BatchOptions, BatchProgress, BatchReport, BatchRunner, FlushMode, ProgressCallback, RunState};
pub use fetch::{
    FetchError, FetchOutcome, Paginator, RateLimitedClient, RetryPolicy, RetryingFetcher, SystemClock,
    TokioSleeper,
};
pub use github::GitHubClient;
pub use record::{Record, Schema};
pub use resource::{RepoId, Resource, UserId};
pub use sink::{CsvSink, JsonLinesSink, MemorySink, RecordSink, SinkError};
pub use variables::{Collector, VariableKind};
