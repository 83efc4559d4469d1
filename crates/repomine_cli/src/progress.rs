//! Progress reporting for collection runs.
//!
//! This module provides two modes of progress reporting:
//! - Interactive mode (TTY): an indicatif progress bar per run
//! - Logging mode (non-TTY): structured logging using tracing

mod interactive;
mod logging;

use std::sync::Arc;

use console::Term;
use repomine::batch::{BatchProgress, ProgressCallback};

pub use interactive::InteractiveReporter;
pub use logging::LoggingReporter;

/// Progress reporter that handles both interactive and logging modes.
pub enum ProgressReporter {
    /// Interactive progress bars for TTY.
    Interactive(InteractiveReporter),
    /// Structured logging for non-TTY (CI, pipes).
    Logging(LoggingReporter),
}

impl ProgressReporter {
    /// Create a new progress reporter, auto-detecting TTY mode.
    pub fn new() -> Self {
        if Term::stdout().is_term() {
            Self::Interactive(InteractiveReporter::new())
        } else {
            Self::Logging(LoggingReporter::new())
        }
    }

    /// Handle a progress event.
    pub fn handle(&self, event: BatchProgress) {
        match self {
            Self::Interactive(r) => r.handle(event),
            Self::Logging(r) => r.handle(event),
        }
    }

    /// Convert to a ProgressCallback for the library.
    pub fn as_callback(self: &Arc<Self>) -> ProgressCallback {
        let reporter = Arc::clone(self);
        Box::new(move |event| {
            reporter.handle(event);
        })
    }

    /// Finish the progress bar (interactive mode only).
    pub fn finish(&self) {
        if let Self::Interactive(r) = self {
            r.finish();
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_forwards_to_logging_reporter() {
        let reporter = Arc::new(ProgressReporter::Logging(LoggingReporter::new()));
        let callback = reporter.as_callback();
        callback(BatchProgress::Flushed { rows: 3 });
        reporter.finish();
    }
}
