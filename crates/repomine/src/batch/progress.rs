//! Progress events emitted by a batch run.
//!
//! Events are purely observational; nothing in the run depends on whether
//! anyone listens.

use uuid::Uuid;

#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum BatchProgress {
    /// The run is starting.
    Started {
        run_id: Uuid,
        /// Variable type being collected.
        kind: String,
        total: usize,
    },

    /// Fetching one resource.
    Fetching {
        /// 0-based position in the input.
        index: usize,
        resource: String,
    },

    /// A resource produced rows (possibly zero).
    Collected { resource: String, records: usize },

    /// A resource was gone or private.
    NotFound { resource: String },

    /// A resource was left out on purpose.
    Skipped { resource: String, reason: String },

    /// A resource was given up on after the retry budget.
    Failed { resource: String, error: String },

    /// Periodic count, every N resources.
    Checkpoint {
        processed: usize,
        total: usize,
        succeeded: usize,
        skipped: usize,
        quota_remaining: Option<u64>,
    },

    /// Rows were written to the sink.
    Flushed { rows: usize },

    /// The run is over.
    Finished {
        processed: usize,
        succeeded: usize,
        skipped: usize,
        failed: usize,
        records: usize,
    },
}

/// Callback for progress updates during a batch run.
pub type ProgressCallback = Box<dyn Fn(BatchProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: BatchProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
