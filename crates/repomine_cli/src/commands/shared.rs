use std::sync::Arc;

use repomine::batch::BatchRunner;
use repomine::fetch::{RateLimitedClient, RetryingFetcher, SystemClock, TokioSleeper};
use repomine::github::GitHubClient;

use crate::config::Config;

/// Everything a collection run needs, wired from configuration.
pub(crate) struct Pipeline {
    /// Quota-aware client handed to collectors.
    pub(crate) limiter: Arc<RateLimitedClient>,
    pub(crate) runner: BatchRunner,
    pub(crate) authenticated: bool,
}

/// Build the GitHub client from configuration.
pub(crate) fn github_client(config: &Config) -> Result<GitHubClient, Box<dyn std::error::Error>> {
    let client = GitHubClient::new(config.github_token())?.with_base_url(&config.github.api_url);
    if !client.is_authenticated() {
        tracing::warn!(
            "No GitHub token configured; anonymous access allows far fewer requests. \
             Set REPOMINE_GITHUB_TOKEN or GITHUB_TOKEN."
        );
    }
    Ok(client)
}

/// Assemble client, quota wrapper, retry engine and batch runner.
pub(crate) fn build_pipeline(
    config: &Config,
    flush_override: Option<repomine::FlushMode>,
) -> Result<Pipeline, Box<dyn std::error::Error>> {
    let client = github_client(config)?;
    let authenticated = client.is_authenticated();

    let clock = Arc::new(SystemClock);
    let sleeper = Arc::new(TokioSleeper);
    let limiter = Arc::new(
        RateLimitedClient::new(Arc::new(client), clock.clone(), sleeper.clone())
            .with_safety_margin(config.pipeline.safety_margin()),
    );
    let fetcher = Arc::new(RetryingFetcher::new(
        limiter.clone(),
        sleeper.clone(),
        config.pipeline.retry_policy(),
    ));

    let mut options = config.pipeline.batch_options(authenticated)?;
    if let Some(flush) = flush_override {
        options.flush = flush;
    }
    tracing::debug!(
        authenticated,
        courtesy_delay_ms = options.courtesy_delay.as_millis() as u64,
        flush = %options.flush,
        "Pipeline ready"
    );

    Ok(Pipeline {
        limiter,
        runner: BatchRunner::new(fetcher, clock, sleeper, options),
        authenticated,
    })
}
