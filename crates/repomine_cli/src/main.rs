//! Repomine CLI - collect research software metadata from GitHub.

mod commands;
mod config;
mod progress;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::Term;
use repomine::FlushMode;
use repomine::variables::VariableKind;
use tracing_subscriber::EnvFilter;

use crate::commands::collect::{CollectRequest, SinkFormat};
use crate::commands::limits::OutputFormat;

#[derive(Parser)]
#[command(name = "repomine")]
#[command(version)]
#[command(about = "Rate-limit aware metadata collection for research software on GitHub")]
#[command(
    long_about = "Repomine reads a table of GitHub repositories (or users), fetches one \
variable type per run and appends dated rows to a CSV table. It waits out quota \
resets, retries transient failures and skips missing resources, so long runs can be \
left unattended and safely restarted."
)]
#[command(after_long_help = r#"EXAMPLES
    Collect contributors for every repository in a table:
        $ repomine collect contributors -i repositories.csv -o data/contributors.csv

    List the repositories of a set of users, without forks and Pages sites:
        $ repomine repos --users users.csv -o repositories.csv

    Remove rows collected twice after a restart:
        $ repomine dedupe -i data/contributors.csv

    Check the remaining quota:
        $ repomine limits

CONFIGURATION
    Repomine reads configuration from:
      1. ~/.config/repomine/config.toml (or $XDG_CONFIG_HOME/repomine/config.toml)
      2. ./repomine.toml
      3. Environment variables (REPOMINE_* prefix, e.g., REPOMINE_PIPELINE__FLUSH)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    REPOMINE_GITHUB_TOKEN     GitHub personal access token (GITHUB_TOKEN also works)
    RUST_LOG                  Log filter (default: repomine=info,repomine_cli=info)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by the collection commands.
#[derive(Debug, Clone, clap::Args)]
struct OutputOptions {
    /// Output file; rows are appended
    #[arg(short, long)]
    output: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = SinkFormat::Csv)]
    format: SinkFormat,

    /// When rows are written: incremental (after every resource) or at_end
    #[arg(long)]
    flush: Option<FlushMode>,

    /// Write the run summary as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect one variable type for every resource in the input table
    Collect {
        /// Variable type: contributors, languages, jupyter_notebooks, commits,
        /// readmes, topics, fair, repositories, users
        kind: VariableKind,

        /// Input table (repositories, or users for `repositories`/`users`)
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        output: OutputOptions,

        /// FAIR checker command line (overrides [fair] command)
        #[arg(long)]
        fair_command: Option<String>,
    },
    /// List the public repositories of every user in a users table
    Repos {
        /// Users table (`user_id`, optional `final_decision`)
        #[arg(short, long)]
        users: PathBuf,

        /// Output file; rows are appended
        #[arg(short, long)]
        output: PathBuf,

        /// Keep forks, Pages sites and repeated ids
        #[arg(long)]
        raw: bool,
    },
    /// Collect the profile of every user in a users table
    Users {
        /// Users table (`user_id`, optional `final_decision`)
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        output: OutputOptions,
    },
    /// Add install/usage/contributing flags to a readmes table
    ReadmeSignals {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Column holding the README text
        #[arg(short, long, default_value = "readme")]
        column: String,
    },
    /// Drop repeated rows from a table
    Dedupe {
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (default: rewrite the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Columns left out of the comparison (default: date)
        #[arg(long = "ignore")]
        ignore: Vec<String>,
    },
    /// Show current rate limit status
    Limits {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

fn collect_request(
    kind: VariableKind,
    input: PathBuf,
    output: OutputOptions,
    fair_command: Option<String>,
) -> CollectRequest {
    CollectRequest {
        kind,
        input,
        output: output.output,
        format: output.format,
        flush: output.flush,
        fair_command,
        report: output.report,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing for non-TTY mode (structured logging)
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("repomine=info,repomine_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        commands::meta::handle_completions(*shell)?;
        return Ok(());
    }

    // Load configuration (config file -> env vars -> defaults)
    let config = config::Config::load();

    match cli.command {
        Commands::Collect {
            kind,
            input,
            output,
            fair_command,
        } => {
            let request = collect_request(kind, input, output, fair_command);
            commands::collect::handle_collect(request, &config).await?;
        }
        Commands::Repos { users, output, raw } => {
            let request = CollectRequest {
                kind: VariableKind::Repositories,
                input: users,
                output: output.clone(),
                format: SinkFormat::Csv,
                flush: None,
                fair_command: None,
                report: None,
            };
            commands::collect::handle_collect(request, &config).await?;
            if !raw {
                commands::collect::clean_repositories(&output)?;
            }
        }
        Commands::Users { input, output } => {
            let request = collect_request(VariableKind::Users, input, output, None);
            commands::collect::handle_collect(request, &config).await?;
        }
        Commands::ReadmeSignals {
            input,
            output,
            column,
        } => {
            commands::tables::handle_readme_signals(&input, &output, &column)?;
        }
        Commands::Dedupe {
            input,
            output,
            ignore,
        } => {
            commands::tables::handle_dedupe(&input, output.as_deref(), &ignore)?;
        }
        Commands::Limits { output } => {
            commands::limits::handle_limits(output, &config).await?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
