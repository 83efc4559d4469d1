use clap::ValueEnum;
use repomine::github::{GitHubRateLimits, RateLimitResource};

use crate::commands::shared::github_client;
use crate::config::Config;

/// Output format for rate limit display.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// Handle the `limits` command.
pub(crate) async fn handle_limits(
    output: OutputFormat,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = github_client(config)?;
    let rate_limits = client.rate_limits().await?;
    let items = github_rate_limits_to_display(&rate_limits.resources);
    RateLimitDisplay::print_many(items, output)?;
    Ok(())
}

/// Rate limit information for display.
#[derive(Debug, Clone, serde::Serialize, tabled::Tabled)]
pub(crate) struct RateLimitDisplay {
    #[tabled(rename = "Resource")]
    pub resource: String,
    #[tabled(rename = "Limit")]
    pub limit: String,
    #[tabled(rename = "Used")]
    pub used: String,
    #[tabled(rename = "Remaining")]
    pub remaining: String,
    #[tabled(rename = "Usage %")]
    pub usage_percent: String,
    #[tabled(rename = "Resets At")]
    pub reset_at: String,
    #[tabled(rename = "Resets In")]
    pub reset_in: String,
}

impl RateLimitDisplay {
    pub(crate) fn from_resource(name: &str, resource: &RateLimitResource) -> Self {
        let usage_percent = if resource.limit > 0 {
            (resource.used as f64 / resource.limit as f64) * 100.0
        } else {
            0.0
        };
        let reset_at = resource.reset_at();
        let reset_duration = reset_at.signed_duration_since(chrono::Utc::now());
        let reset_in = if reset_duration.num_seconds() > 0 {
            format_duration(reset_duration)
        } else {
            "now".to_string()
        };

        Self {
            resource: name.to_string(),
            limit: resource.limit.to_string(),
            used: resource.used.to_string(),
            remaining: resource.remaining.to_string(),
            usage_percent: format!("{:.1}%", usage_percent),
            reset_at: reset_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            reset_in,
        }
    }

    pub(crate) fn print_many(
        mut items: Vec<Self>,
        format: OutputFormat,
    ) -> Result<(), serde_json::Error> {
        items.sort_by(|a, b| a.resource.cmp(&b.resource));

        match format {
            OutputFormat::Table => {
                let mut table = tabled::Table::new(items);
                table.with(tabled::settings::Style::rounded());
                println!("{}", table);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&items)?);
            }
        }
        Ok(())
    }
}

/// Rows for every resource the API reported.
pub(crate) fn github_rate_limits_to_display(limits: &GitHubRateLimits) -> Vec<RateLimitDisplay> {
    let mut items = vec![
        RateLimitDisplay::from_resource("core", &limits.core),
        RateLimitDisplay::from_resource("search", &limits.search),
    ];
    if let Some(ref r) = limits.graphql {
        items.push(RateLimitDisplay::from_resource("graphql", r));
    }
    if let Some(ref r) = limits.code_search {
        items.push(RateLimitDisplay::from_resource("code_search", r));
    }
    items
}

/// Format a duration in a human-readable way.
fn format_duration(duration: chrono::Duration) -> String {
    let total_secs = duration.num_seconds();
    if total_secs < 60 {
        format!("{}s", total_secs)
    } else if total_secs < 3600 {
        let (mins, secs) = (total_secs / 60, total_secs % 60);
        if secs > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}m", mins)
        }
    } else {
        let (hours, mins) = (total_secs / 3600, (total_secs % 3600) / 60);
        if mins > 0 {
            format!("{}h {}m", hours, mins)
        } else {
            format!("{}h", hours)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_resource(limit: u64, used: u64, remaining: u64, reset: i64) -> RateLimitResource {
        RateLimitResource {
            limit,
            used,
            remaining,
            reset,
        }
    }

    #[test]
    fn output_format_default_is_table() {
        assert!(matches!(OutputFormat::default(), OutputFormat::Table));
    }

    #[test]
    fn format_duration_handles_seconds_minutes_and_hours() {
        assert_eq!(format_duration(chrono::Duration::seconds(42)), "42s");
        assert_eq!(format_duration(chrono::Duration::seconds(120)), "2m");
        assert_eq!(format_duration(chrono::Duration::seconds(125)), "2m 5s");
        assert_eq!(format_duration(chrono::Duration::seconds(3600)), "1h");
        assert_eq!(format_duration(chrono::Duration::seconds(3900)), "1h 5m");
    }

    #[test]
    fn display_includes_optional_resources_when_present() {
        let limits = GitHubRateLimits {
            core: sample_resource(5000, 1000, 4000, 2_000_000_000),
            search: sample_resource(30, 5, 25, 2_000_000_000),
            graphql: Some(sample_resource(5000, 50, 4950, 2_000_000_000)),
            code_search: None,
        };

        let display = github_rate_limits_to_display(&limits);
        let names: Vec<_> = display.iter().map(|d| d.resource.as_str()).collect();

        assert_eq!(names, vec!["core", "search", "graphql"]);
    }

    #[test]
    fn display_formats_percent_and_reset() {
        let display = RateLimitDisplay::from_resource("core", &sample_resource(100, 25, 75, 2_000_000_000));

        assert_eq!(display.limit, "100");
        assert_eq!(display.remaining, "75");
        assert_eq!(display.usage_percent, "25.0%");
        assert!(display.reset_at.contains("UTC"));
    }

    #[test]
    fn print_many_supports_json_and_table() {
        let items = vec![RateLimitDisplay::from_resource("core", &sample_resource(10, 1, 9, 0))];
        RateLimitDisplay::print_many(items.clone(), OutputFormat::Json).unwrap();
        RateLimitDisplay::print_many(items, OutputFormat::Table).unwrap();
    }
}
