use repomine::batch::BatchProgress;

/// Logging reporter using tracing for structured output.
///
/// The batch runner already logs its own checkpoints, so only per-resource
/// detail is reported here.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: BatchProgress) {
        match event {
            BatchProgress::Fetching { index, resource } => {
                tracing::debug!(index, resource = %resource, "Fetching");
            }

            BatchProgress::Collected { resource, records } => {
                tracing::debug!(resource = %resource, records, "Collected");
            }

            BatchProgress::NotFound { resource } => {
                tracing::debug!(resource = %resource, "Not found");
            }

            BatchProgress::Skipped { resource, reason } => {
                tracing::debug!(resource = %resource, reason = %reason, "Skipped");
            }

            BatchProgress::Failed { resource, error } => {
                tracing::warn!(resource = %resource, error = %error, "Failed");
            }

            BatchProgress::Flushed { rows } => {
                tracing::info!(rows, "Wrote rows");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
