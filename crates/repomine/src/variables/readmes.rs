use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use super::{Collector, VariableKind};
use crate::api::{ApiClient, ApiError, Query, decode};
use crate::github::types::ReadmeFile;
use crate::record::{Record, Schema};
use crate::resource::{RepoId, Resource};

pub(super) static SCHEMA: Schema = Schema {
    name: "readmes",
    key_column: "html_url",
    columns: &["readme"],
};

/// Decoded README text of a repository.
pub struct ReadmesCollector {
    api: Arc<dyn ApiClient>,
}

impl ReadmesCollector {
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Collector for ReadmesCollector {
    type Target = RepoId;

    fn kind(&self) -> VariableKind {
        VariableKind::Readmes
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    async fn collect(&self, repo: &RepoId) -> Result<Vec<Record>, ApiError> {
        let file: ReadmeFile = decode(self.api.get(&repo.route("/readme"), &Query::new()).await?)?;
        Ok(vec![Record::new(repo.key(), vec![file.text()?])])
    }
}

static INSTALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)install|docker").expect("install pattern is valid"));
static USAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)usage|getting started|quick start|example|tutorial")
        .expect("usage pattern is valid")
});
static CONTRIBUTING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)contribut").expect("contributing pattern is valid"));

/// Documentation signals detected in README text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadmeSignals {
    pub has_install_instruction: bool,
    pub has_usage_examples: bool,
    pub has_contrib_guidelines: bool,
}

impl ReadmeSignals {
    pub const COLUMNS: [&'static str; 3] = [
        "has_install_instruction",
        "has_usage_examples",
        "has_contrib_guidelines",
    ];

    pub fn detect(text: &str) -> Self {
        Self {
            has_install_instruction: INSTALL.is_match(text),
            has_usage_examples: USAGE.is_match(text),
            has_contrib_guidelines: CONTRIBUTING.is_match(text),
        }
    }

    /// Values in [`Self::COLUMNS`] order.
    pub fn values(&self) -> [bool; 3] {
        [
            self.has_install_instruction,
            self.has_usage_examples,
            self.has_contrib_guidelines,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;
    use serde_json::json;

    #[tokio::test]
    async fn test_readme_is_decoded() {
        let api = Arc::new(FakeApi::new());
        api.push_get(
            "/repos/o/r/readme",
            Ok(json!({"content": "IyBUaXRs\nZQoKcGlw\nIGluc3Rh\nbGw=\n", "encoding": "base64"})),
        );

        let records = ReadmesCollector::new(api)
            .collect(&RepoId::new("o", "r").unwrap())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].values, vec!["# Title\n\npip install"]);
    }

    #[test]
    fn test_signals_are_case_insensitive() {
        let signals = ReadmeSignals::detect("## Quick Start\nRun with Docker.\n");
        assert_eq!(
            signals,
            ReadmeSignals {
                has_install_instruction: true,
                has_usage_examples: true,
                has_contrib_guidelines: false,
            }
        );

        let signals = ReadmeSignals::detect("See CONTRIBUTORS.md");
        assert_eq!(signals.values(), [false, false, true]);
    }

    #[test]
    fn test_no_signals_in_empty_text() {
        assert_eq!(ReadmeSignals::detect(""), ReadmeSignals::default());
    }
}
