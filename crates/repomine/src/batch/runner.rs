use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use super::progress::{BatchProgress, ProgressCallback, emit};
use super::state::{Accumulator, RunState};
use crate::api::short_error_message;
use crate::fetch::{Clock, FetchError, FetchOutcome, RetryingFetcher, Sleeper};
use crate::sink::{RecordSink, SinkError};
use crate::variables::Collector;

/// Pause after each successful fetch when authenticated.
pub const DEFAULT_COURTESY_DELAY: Duration = Duration::from_secs(2);

/// Pause after each successful fetch without a token.
pub const ANONYMOUS_COURTESY_DELAY: Duration = Duration::from_secs(6);

/// Default progress interval, in resources.
pub const DEFAULT_PROGRESS_EVERY: usize = 10;

/// When collected rows reach the sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlushMode {
    /// After every resource; a crash loses at most the in-flight resource.
    #[default]
    Incremental,
    /// Once, when the run is over.
    AtEnd,
}

impl fmt::Display for FlushMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Incremental => "incremental",
            Self::AtEnd => "at_end",
        })
    }
}

impl FromStr for FlushMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "incremental" | "each" => Ok(Self::Incremental),
            "at_end" | "end" => Ok(Self::AtEnd),
            other => Err(format!("unknown flush mode '{other}' (expected incremental or at_end)")),
        }
    }
}

/// Options for a [`BatchRunner`].
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Emit a checkpoint every this many resources (0 disables).
    pub progress_every: usize,
    /// Pause after each successful fetch, independent of the quota.
    pub courtesy_delay: Duration,
    pub flush: FlushMode,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            progress_every: DEFAULT_PROGRESS_EVERY,
            courtesy_delay: DEFAULT_COURTESY_DELAY,
            flush: FlushMode::Incremental,
        }
    }
}

impl BatchOptions {
    /// Defaults with the courtesy delay for (un)authenticated access.
    pub fn for_access(authenticated: bool) -> Self {
        Self {
            courtesy_delay: if authenticated {
                DEFAULT_COURTESY_DELAY
            } else {
                ANONYMOUS_COURTESY_DELAY
            },
            ..Self::default()
        }
    }
}

/// What a finished run leaves behind.
#[derive(Debug)]
pub struct BatchReport {
    pub state: RunState,
    pub accumulator: Accumulator,
}

/// Drives a collector across every target.
///
/// One resource failing never stops the run: not-found and skipped
/// resources are counted and logged, and a resource that exhausts its retry
/// budget is logged and skipped. Only a sink failure aborts, since the
/// output could no longer be trusted.
pub struct BatchRunner {
    fetcher: Arc<RetryingFetcher>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    options: BatchOptions,
}

impl BatchRunner {
    pub fn new(
        fetcher: Arc<RetryingFetcher>,
        clock: Arc<dyn Clock>,
        sleeper: Arc<dyn Sleeper>,
        options: BatchOptions,
    ) -> Self {
        Self {
            fetcher,
            clock,
            sleeper,
            options,
        }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Collect `targets` in order, writing rows to `sink`.
    pub async fn run<C: Collector>(
        &self,
        collector: &C,
        targets: &[C::Target],
        sink: &mut dyn RecordSink,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<BatchReport, SinkError> {
        let schema = collector.schema();
        let date = self.clock.now().date_naive();
        let mut state = RunState::new(targets.len(), self.clock.now());
        let mut accumulator = Accumulator::new(schema);

        sink.begin(schema)?;

        tracing::info!(
            run_id = %state.run_id,
            kind = %collector.kind(),
            total = targets.len(),
            flush = %self.options.flush,
            "Starting batch"
        );
        emit(
            on_progress,
            BatchProgress::Started {
                run_id: state.run_id,
                kind: collector.kind().to_string(),
                total: targets.len(),
            },
        );

        for (index, target) in targets.iter().enumerate() {
            let resource = target.to_string();
            emit(
                on_progress,
                BatchProgress::Fetching {
                    index,
                    resource: resource.clone(),
                },
            );

            let outcome = self
                .fetcher
                .fetch(&resource, move || collector.collect(target))
                .await;
            state.processed += 1;

            match outcome {
                Ok(FetchOutcome::Success(records)) => {
                    let count = records.len();
                    state.succeeded += 1;
                    state.records += count;
                    if self.options.flush == FlushMode::Incremental && count > 0 {
                        sink.append(&records, date)?;
                        sink.flush()?;
                    }
                    accumulator.extend(records);
                    tracing::debug!(resource = %resource, records = count, "Collected");
                    emit(
                        on_progress,
                        BatchProgress::Collected {
                            resource: resource.clone(),
                            records: count,
                        },
                    );
                    self.sleeper.sleep(self.options.courtesy_delay).await;
                }
                Ok(FetchOutcome::NotFound) => {
                    state.not_found += 1;
                    state.skipped += 1;
                    tracing::info!(resource = %resource, "Not found, skipping");
                    emit(on_progress, BatchProgress::NotFound { resource });
                }
                Ok(FetchOutcome::Skipped(reason)) => {
                    state.skipped += 1;
                    tracing::info!(resource = %resource, reason = %reason, "Skipping");
                    emit(on_progress, BatchProgress::Skipped { resource, reason });
                }
                Ok(unsettled) => {
                    state.failed += 1;
                    state.skipped += 1;
                    tracing::error!(
                        resource = %resource,
                        outcome = unsettled.label(),
                        "Fetch returned without settling, skipping"
                    );
                    emit(
                        on_progress,
                        BatchProgress::Failed {
                            resource,
                            error: unsettled.label().to_string(),
                        },
                    );
                }
                Err(e @ FetchError::Fatal { .. }) => {
                    state.failed += 1;
                    state.skipped += 1;
                    tracing::error!(resource = %resource, error = %e, "Giving up on resource");
                    emit(
                        on_progress,
                        BatchProgress::Failed {
                            resource,
                            error: short_error_message(&e),
                        },
                    );
                }
            }

            let quota = self.fetcher.limiter().snapshot();
            state.quota_remaining = quota.remaining;
            state.last_reset = quota.reset_at;

            if self.options.progress_every > 0 && state.processed % self.options.progress_every == 0 {
                tracing::info!(
                    processed = state.processed,
                    total = state.total,
                    succeeded = state.succeeded,
                    skipped = state.skipped,
                    quota_remaining = ?state.quota_remaining,
                    "Progress"
                );
                emit(
                    on_progress,
                    BatchProgress::Checkpoint {
                        processed: state.processed,
                        total: state.total,
                        succeeded: state.succeeded,
                        skipped: state.skipped,
                        quota_remaining: state.quota_remaining,
                    },
                );
            }
        }

        if self.options.flush == FlushMode::AtEnd && !accumulator.is_empty() {
            sink.append(accumulator.records(), date)?;
            emit(
                on_progress,
                BatchProgress::Flushed {
                    rows: accumulator.len(),
                },
            );
        }
        sink.flush()?;

        state.finished_at = Some(self.clock.now());
        tracing::info!(
            run_id = %state.run_id,
            processed = state.processed,
            succeeded = state.succeeded,
            not_found = state.not_found,
            skipped = state.skipped,
            failed = state.failed,
            records = state.records,
            "Batch complete"
        );
        emit(
            on_progress,
            BatchProgress::Finished {
                processed: state.processed,
                succeeded: state.succeeded,
                skipped: state.skipped,
                failed: state.failed,
                records: state.records,
            },
        );

        Ok(BatchReport { state, accumulator })
    }
}
