use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::ValueEnum;
use console::Term;
use repomine::batch::{FlushMode, RunState};
use repomine::input::{read_repositories, read_users};
use repomine::sink::{CsvSink, JsonLinesSink, RecordSink};
use repomine::table::{Table, filter_repositories};
use repomine::variables::{
    CommandFairChecker, CommitsCollector, Collector, ContributorsCollector, FairCollector,
    LanguagesCollector, NotebooksCollector, ReadmesCollector, RepositoriesCollector,
    TopicsCollector, UsersCollector, VariableKind,
};

use crate::commands::shared::{Pipeline, build_pipeline};
use crate::config::Config;
use crate::progress::ProgressReporter;

/// Output file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum SinkFormat {
    /// Comma-separated values, appended to (default)
    #[default]
    Csv,
    /// One JSON object per line
    Jsonl,
}

/// Options for one collection run.
#[derive(Debug, Clone)]
pub(crate) struct CollectRequest {
    pub(crate) kind: VariableKind,
    pub(crate) input: PathBuf,
    pub(crate) output: PathBuf,
    pub(crate) format: SinkFormat,
    pub(crate) flush: Option<FlushMode>,
    pub(crate) fair_command: Option<String>,
    pub(crate) report: Option<PathBuf>,
}

fn open_sink(path: &Path, format: SinkFormat) -> Box<dyn RecordSink> {
    match format {
        SinkFormat::Csv => Box::new(CsvSink::new(path)),
        SinkFormat::Jsonl => Box::new(JsonLinesSink::new(path)),
    }
}

/// Run one collector over its targets, stopping early on Ctrl+C.
///
/// Rows flushed before an interrupt stay in the output; rerunning appends
/// again and a later dedupe removes the overlap.
async fn run_collector<C: Collector>(
    pipeline: &Pipeline,
    collector: &C,
    targets: &[C::Target],
    request: &CollectRequest,
) -> Result<RunState, Box<dyn std::error::Error>> {
    let mut sink = open_sink(&request.output, request.format);
    let reporter = Arc::new(ProgressReporter::new());
    let callback = reporter.as_callback();

    let run = pipeline
        .runner
        .run(collector, targets, sink.as_mut(), Some(&callback));

    let report = tokio::select! {
        result = run => result?,
        _ = tokio::signal::ctrl_c() => {
            reporter.finish();
            if Term::stdout().is_term() {
                eprintln!("\nInterrupted; rows written so far are kept in {}", request.output.display());
            } else {
                tracing::warn!(output = %request.output.display(), "Interrupted, keeping rows written so far");
            }
            return Err("interrupted".into());
        }
    };
    reporter.finish();

    Ok(report.state)
}

/// Handle `collect`.
pub(crate) async fn handle_collect(
    request: CollectRequest,
    config: &Config,
) -> Result<RunState, Box<dyn std::error::Error>> {
    let pipeline = build_pipeline(config, request.flush)?;
    let api = pipeline.limiter.clone();
    let input = request.input.as_path();

    let state = match request.kind {
        VariableKind::Contributors => {
            let targets = read_repositories(input)?;
            run_collector(&pipeline, &ContributorsCollector::new(api), &targets, &request).await?
        }
        VariableKind::Languages => {
            let targets = read_repositories(input)?;
            run_collector(&pipeline, &LanguagesCollector::new(api), &targets, &request).await?
        }
        VariableKind::JupyterNotebooks => {
            let targets = read_repositories(input)?;
            run_collector(&pipeline, &NotebooksCollector::new(api), &targets, &request).await?
        }
        VariableKind::Commits => {
            let targets = read_repositories(input)?;
            run_collector(&pipeline, &CommitsCollector::new(api), &targets, &request).await?
        }
        VariableKind::Readmes => {
            let targets = read_repositories(input)?;
            run_collector(&pipeline, &ReadmesCollector::new(api), &targets, &request).await?
        }
        VariableKind::Topics => {
            let targets = read_repositories(input)?;
            run_collector(&pipeline, &TopicsCollector::new(api), &targets, &request).await?
        }
        VariableKind::Fair => {
            let command = request
                .fair_command
                .clone()
                .or_else(|| config.fair.command.clone())
                .ok_or("no FAIR checker configured: pass --fair-command or set [fair] command")?;
            let checker = CommandFairChecker::from_command_line(&command)
                .ok_or("the FAIR checker command is empty")?
                .with_timeout(std::time::Duration::from_secs(config.fair.timeout_secs));
            let targets = read_repositories(input)?;
            run_collector(
                &pipeline,
                &FairCollector::new(Arc::new(checker)),
                &targets,
                &request,
            )
            .await?
        }
        VariableKind::Repositories => {
            let targets = read_users(input)?;
            run_collector(&pipeline, &RepositoriesCollector::new(api), &targets, &request).await?
        }
        VariableKind::Users => {
            let targets = read_users(input)?;
            run_collector(&pipeline, &UsersCollector::new(api), &targets, &request).await?
        }
    };

    if let Some(path) = &request.report {
        std::fs::write(path, serde_json::to_string_pretty(&state)?)?;
    }
    print_summary(&state, &request.output, pipeline.authenticated);
    Ok(state)
}

/// Rewrite a repositories table without forks, Pages sites and repeated ids.
pub(crate) fn clean_repositories(path: &Path) -> Result<usize, Box<dyn std::error::Error>> {
    let table = Table::read_csv(path)?;
    let cleaned = filter_repositories(&table)?;
    let dropped = table.len() - cleaned.len();
    cleaned.write_csv(path)?;
    tracing::info!(path = %path.display(), kept = cleaned.len(), dropped, "Cleaned repositories");
    Ok(dropped)
}

fn print_summary(state: &RunState, output: &Path, authenticated: bool) {
    if !Term::stdout().is_term() {
        return;
    }
    println!(
        "{} of {} resources collected, {} rows written to {}",
        state.succeeded,
        state.total,
        state.records,
        output.display()
    );
    if state.skipped > 0 {
        println!(
            "  {} skipped ({} not found, {} failed)",
            state.skipped, state.not_found, state.failed
        );
    }
    if let Some(remaining) = state.quota_remaining {
        let access = if authenticated { "" } else { " (anonymous)" };
        println!("  {} API requests left{}", remaining, access);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_format_default_is_csv() {
        assert_eq!(SinkFormat::default(), SinkFormat::Csv);
    }

    #[test]
    fn test_clean_repositories_rewrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repositories.csv");
        std::fs::write(
            &path,
            "user_id,id,owner,name,html_url,fork,date\n\
             alice,1,alice,tool,https://github.com/alice/tool,false,2024-01-01\n\
             alice,2,alice,alice.github.io,https://github.com/alice/alice.github.io,false,2024-01-01\n\
             alice,3,alice,fork,https://github.com/alice/fork,true,2024-01-01\n\
             alice,1,alice,tool,https://github.com/alice/tool,false,2024-01-02\n",
        )
        .unwrap();

        let dropped = clean_repositories(&path).unwrap();

        assert_eq!(dropped, 3);
        let table = Table::read_csv(&path).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0][3], "tool");
    }
}
