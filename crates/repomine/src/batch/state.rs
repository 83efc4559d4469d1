use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::record::{Record, Schema};

/// Counters for one batch run.
///
/// Created when the run starts and dropped with it; nothing is persisted
/// across runs, so a restart reprocesses the whole input.
#[derive(Debug, Clone, Serialize)]
pub struct RunState {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Resources in the input.
    pub total: usize,
    /// Resources settled so far, whatever the outcome.
    pub processed: usize,
    pub succeeded: usize,
    /// Resources that were gone or private (also counted in `skipped`).
    pub not_found: usize,
    /// Resources that produced no output.
    pub skipped: usize,
    /// Resources given up on after the retry budget (also counted in `skipped`).
    pub failed: usize,
    /// Rows collected.
    pub records: usize,
    pub quota_remaining: Option<u64>,
    pub last_reset: Option<DateTime<Utc>>,
}

impl RunState {
    pub fn new(total: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: None,
            total,
            processed: 0,
            succeeded: 0,
            not_found: 0,
            skipped: 0,
            failed: 0,
            records: 0,
            quota_remaining: None,
            last_reset: None,
        }
    }

    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.processed)
    }
}

/// Append-only rows for one variable type.
#[derive(Debug, Clone)]
pub struct Accumulator {
    schema: &'static Schema,
    records: Vec<Record>,
}

impl Accumulator {
    pub fn new(schema: &'static Schema) -> Self {
        Self {
            schema,
            records: Vec::new(),
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = Record>) {
        self.records.extend(records);
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Rows collected for one resource key.
    pub fn for_resource<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        self.records.iter().filter(move |r| r.resource == key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}
