//! Output destinations for collected records.
//!
//! Sinks are append-friendly: a run that dies halfway leaves every row it
//! flushed intact, and the next run simply appends again.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

use crate::record::{Record, Schema};

/// Errors raised while writing output.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{path} already has columns {found:?}, expected {expected:?}")]
    HeaderMismatch {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("record for {resource} has {found} values, schema expects {expected}")]
    Shape {
        resource: String,
        expected: usize,
        found: usize,
    },

    #[error("sink used before begin()")]
    NotStarted,
}

impl SinkError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Destination for one variable type's table.
pub trait RecordSink: Send {
    /// Prepare for rows of `schema`.
    fn begin(&mut self, schema: &Schema) -> Result<(), SinkError>;

    /// Append rows stamped with the collection `date`.
    fn append(&mut self, records: &[Record], date: NaiveDate) -> Result<(), SinkError>;

    /// Push buffered rows to durable storage.
    fn flush(&mut self) -> Result<(), SinkError>;
}

fn check_shape(record: &Record, schema_columns: usize) -> Result<(), SinkError> {
    if record.values.len() != schema_columns {
        return Err(SinkError::Shape {
            resource: record.resource.clone(),
            expected: schema_columns,
            found: record.values.len(),
        });
    }
    Ok(())
}

fn open_append(path: &Path) -> Result<(File, bool), SinkError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| SinkError::io(parent, e))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| SinkError::io(path, e))?;
    let is_empty = file.metadata().map_err(|e| SinkError::io(path, e))?.len() == 0;
    Ok((file, is_empty))
}

/// Appends rows to a CSV file.
///
/// The header is written only when the file is new or empty. An existing
/// file must already carry the same header.
pub struct CsvSink {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
    columns: usize,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            columns: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn existing_header(&self) -> Result<Vec<String>, SinkError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;
        Ok(reader.headers()?.iter().map(String::from).collect())
    }
}

impl RecordSink for CsvSink {
    fn begin(&mut self, schema: &Schema) -> Result<(), SinkError> {
        let header = schema.header();
        let (file, is_empty) = open_append(&self.path)?;

        if !is_empty {
            let found = self.existing_header()?;
            if found != header {
                return Err(SinkError::HeaderMismatch {
                    path: self.path.clone(),
                    expected: header,
                    found,
                });
            }
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_empty {
            writer.write_record(&header)?;
            writer.flush().map_err(|e| SinkError::io(&self.path, e))?;
        }

        tracing::debug!(path = %self.path.display(), new_file = is_empty, "Opened CSV sink");
        self.columns = schema.columns.len();
        self.writer = Some(writer);
        Ok(())
    }

    fn append(&mut self, records: &[Record], date: NaiveDate) -> Result<(), SinkError> {
        let writer = self.writer.as_mut().ok_or(SinkError::NotStarted)?;
        for record in records {
            check_shape(record, self.columns)?;
            writer.write_record(record.row(date))?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush().map_err(|e| SinkError::io(&self.path, e))?;
        }
        Ok(())
    }
}

/// Appends rows to a JSON Lines file, one object per row keyed by column.
pub struct JsonLinesSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    header: Vec<String>,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            header: Vec::new(),
        }
    }
}

impl RecordSink for JsonLinesSink {
    fn begin(&mut self, schema: &Schema) -> Result<(), SinkError> {
        let (file, _) = open_append(&self.path)?;
        self.header = schema.header();
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    fn append(&mut self, records: &[Record], date: NaiveDate) -> Result<(), SinkError> {
        let writer = self.writer.as_mut().ok_or(SinkError::NotStarted)?;
        for record in records {
            check_shape(record, self.header.len() - 2)?;
            let object: serde_json::Map<String, serde_json::Value> = self
                .header
                .iter()
                .cloned()
                .zip(record.row(date).into_iter().map(serde_json::Value::String))
                .collect();
            serde_json::to_writer(&mut *writer, &object)?;
            writer
                .write_all(b"\n")
                .map_err(|e| SinkError::io(&self.path, e))?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush().map_err(|e| SinkError::io(&self.path, e))?;
        }
        Ok(())
    }
}

/// Keeps rows in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    appends: usize,
    flushes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of non-empty `append` calls.
    pub fn appends(&self) -> usize {
        self.appends
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl RecordSink for MemorySink {
    fn begin(&mut self, schema: &Schema) -> Result<(), SinkError> {
        self.header = schema.header();
        Ok(())
    }

    fn append(&mut self, records: &[Record], date: NaiveDate) -> Result<(), SinkError> {
        if records.is_empty() {
            return Ok(());
        }
        self.appends += 1;
        self.rows.extend(records.iter().map(|r| r.row(date)));
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.flushes += 1;
        Ok(())
    }
}
