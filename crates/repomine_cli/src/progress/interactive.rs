use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use repomine::batch::BatchProgress;

/// Tallies shown next to the bar.
#[derive(Default)]
struct Counts {
    collected: usize,
    records: usize,
    skipped: usize,
    failed: usize,
}

/// Interactive progress reporter using indicatif.
///
/// One bar per run, advanced once per settled resource.
pub struct InteractiveReporter {
    state: Mutex<(Option<ProgressBar>, Counts)>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new((None, Counts::default())),
        }
    }

    pub fn handle(&self, event: BatchProgress) {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let (bar, counts) = &mut *guard;

        match event {
            BatchProgress::Started { kind, total, .. } => {
                let pb = ProgressBar::new(total as u64);
                pb.set_style(Self::bar_style());
                pb.set_prefix(format!("{:12}", kind));
                pb.set_message("Starting...");
                *bar = Some(pb);
                *counts = Counts::default();
            }

            BatchProgress::Fetching { resource, .. } => {
                if let Some(pb) = bar {
                    pb.set_message(resource);
                }
            }

            BatchProgress::Collected { resource, records } => {
                counts.collected += 1;
                counts.records += records;
                if let Some(pb) = bar {
                    pb.inc(1);
                    pb.set_message(format!("✓ {} ({} rows)", resource, records));
                }
            }

            BatchProgress::NotFound { resource } => {
                counts.skipped += 1;
                if let Some(pb) = bar {
                    pb.inc(1);
                    pb.set_message(format!("· {} not found", resource));
                }
            }

            BatchProgress::Skipped { resource, reason } => {
                counts.skipped += 1;
                if let Some(pb) = bar {
                    pb.inc(1);
                    pb.set_message(format!("· {}: {}", resource, reason));
                }
            }

            BatchProgress::Failed { resource, error } => {
                counts.skipped += 1;
                counts.failed += 1;
                if let Some(pb) = bar {
                    pb.inc(1);
                    pb.println(format!("✗ {}: {}", resource, error));
                }
            }

            BatchProgress::Checkpoint {
                quota_remaining: Some(remaining),
                ..
            } => {
                if let Some(pb) = bar {
                    pb.set_message(format!("{} requests left", remaining));
                }
            }

            BatchProgress::Finished { .. } => {
                if let Some(pb) = bar.take() {
                    let msg = if counts.failed > 0 {
                        format!(
                            "✓ {} collected ({} rows), {} skipped, {} failed",
                            counts.collected, counts.records, counts.skipped, counts.failed
                        )
                    } else {
                        format!(
                            "✓ {} collected ({} rows), {} skipped",
                            counts.collected, counts.records, counts.skipped
                        )
                    };
                    pb.finish_with_message(msg);
                }
            }

            _ => {}
        }
    }

    /// Finish the bar if a run was cut short.
    pub fn finish(&self) {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pb) = guard.0.take()
            && !pb.is_finished()
        {
            pb.abandon();
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>4}/{len:4} {msg}")
            .expect("Invalid template")
            .progress_chars("█▓░")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
