//! Batch orchestration: one variable type over a list of resources.

mod progress;
mod runner;
mod state;

pub use progress::{BatchProgress, ProgressCallback, emit};
pub use runner::{
    ANONYMOUS_COURTESY_DELAY, BatchOptions, BatchReport, BatchRunner, DEFAULT_COURTESY_DELAY,
    DEFAULT_PROGRESS_EVERY, FlushMode,
};
pub use state::{Accumulator, RunState};
