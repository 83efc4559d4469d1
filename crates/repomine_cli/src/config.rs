//! Configuration file support for repomine.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `REPOMINE_`, sections separated by
//!    `__`, e.g., `REPOMINE_PIPELINE__FLUSH`); the token is also read from
//!    `REPOMINE_GITHUB_TOKEN` or `GITHUB_TOKEN`
//! 3. Config file (~/.config/repomine/config.toml or ./repomine.toml)
//! 4. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [github]
//! token = "ghp_..."  # or use REPOMINE_GITHUB_TOKEN / GITHUB_TOKEN
//! api_url = "https://api.github.com"
//!
//! [pipeline]
//! courtesy_delay_secs = 2
//! anonymous_delay_secs = 6
//! progress_every = 10
//! safety_margin_secs = 2
//! transient_delay_secs = 5
//! transient_budget_secs = 600
//! min_quota = 1
//! flush = "incremental"
//!
//! [fair]
//! command = "howfairis-check"
//! timeout_secs = 120
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use repomine::batch::{BatchOptions, FlushMode};
use repomine::fetch::RetryPolicy;
use repomine::github::DEFAULT_API_URL;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github: GitHubConfig,
    pub pipeline: PipelineConfig,
    pub fair: FairConfig,
}

/// GitHub configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// API token. Can also be set via REPOMINE_GITHUB_TOKEN or GITHUB_TOKEN.
    pub token: Option<String>,
    /// API root, for GitHub Enterprise.
    pub api_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

/// Pacing and retry settings for collection runs.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pause after each resource when authenticated.
    pub courtesy_delay_secs: u64,
    /// Pause after each resource without a token.
    pub anonymous_delay_secs: u64,
    pub progress_every: usize,
    /// Margin added after a quota reset before resuming.
    pub safety_margin_secs: u64,
    pub transient_delay_secs: u64,
    pub transient_budget_secs: u64,
    /// Wait for a reset before any request when fewer remain (0 disables).
    pub min_quota: u64,
    /// `incremental` or `at_end`.
    pub flush: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            courtesy_delay_secs: 2,
            anonymous_delay_secs: 6,
            progress_every: 10,
            safety_margin_secs: 2,
            transient_delay_secs: 5,
            transient_budget_secs: 600,
            min_quota: 1,
            flush: FlushMode::Incremental.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            transient_delay: Duration::from_secs(self.transient_delay_secs),
            transient_budget: Duration::from_secs(self.transient_budget_secs),
            min_quota: (self.min_quota > 0).then_some(self.min_quota),
        }
    }

    pub fn safety_margin(&self) -> Duration {
        Duration::from_secs(self.safety_margin_secs)
    }

    /// Batch options for an authenticated or anonymous run.
    pub fn batch_options(&self, authenticated: bool) -> Result<BatchOptions, String> {
        let courtesy = if authenticated {
            self.courtesy_delay_secs
        } else {
            self.anonymous_delay_secs
        };
        Ok(BatchOptions {
            progress_every: self.progress_every,
            courtesy_delay: Duration::from_secs(courtesy),
            flush: self.flush.parse()?,
        })
    }
}

/// External FAIR checker.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FairConfig {
    /// Command line run with the repository URL appended.
    pub command: Option<String>,
    pub timeout_secs: u64,
}

impl Default for FairConfig {
    fn default() -> Self {
        Self {
            command: None,
            timeout_secs: 120,
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/repomine/config.toml)
    /// 3. Local config file (./repomine.toml)
    /// 4. Environment variables with REPOMINE_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("repomine.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./repomine.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // REPOMINE_PIPELINE__FLUSH -> pipeline.flush
        builder = builder.add_source(
            Environment::with_prefix("REPOMINE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut config = match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        };

        if let Ok(token) = std::env::var("REPOMINE_GITHUB_TOKEN") {
            config.github.token = Some(token);
        } else if config.github.token.is_none() {
            config.github.token = std::env::var("GITHUB_TOKEN").ok();
        }
        config
    }

    /// The GitHub token, if any non-empty one is configured.
    pub fn github_token(&self) -> Option<String> {
        self.github.token.clone().filter(|t| !t.trim().is_empty())
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "repomine").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
