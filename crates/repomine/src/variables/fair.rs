//! FAIR-compliance signals from an external checker.
//!
//! The checker is a black box that takes a repository URL and answers with
//! five booleans in a fixed order. It has its own failure modes, which are
//! mapped onto [`ApiError`] so the retry engine treats them like any other
//! fetch failure.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::{Collector, VariableKind};
use crate::api::{ApiError, sniff_status};
use crate::record::{Record, Schema};
use crate::resource::{RepoId, Resource};

pub(super) static SCHEMA: Schema = Schema {
    name: "fair",
    key_column: "html_url",
    columns: &[
        "howfairis_repository",
        "howfairis_license",
        "howfairis_registry",
        "howfairis_citation",
        "howfairis_checklist",
    ],
};

/// The five FAIR recommendations, in checker order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FairCompliance {
    pub repository: bool,
    pub license: bool,
    pub registry: bool,
    pub citation: bool,
    pub checklist: bool,
}

impl FairCompliance {
    pub fn from_array(values: [bool; 5]) -> Self {
        let [repository, license, registry, citation, checklist] = values;
        Self {
            repository,
            license,
            registry,
            citation,
            checklist,
        }
    }

    pub fn values(&self) -> [bool; 5] {
        [
            self.repository,
            self.license,
            self.registry,
            self.citation,
            self.checklist,
        ]
    }
}

/// Failures reported by a [`FairChecker`].
#[derive(Debug, Error)]
pub enum FairError {
    /// The repository has no default branch; it can never be checked.
    #[error("repository has no default branch: {0}")]
    NoDefaultBranch(String),

    #[error("checker timed out after {0:?}")]
    Timeout(Duration),

    #[error("checker was rate limited: {0}")]
    RateLimited(String),

    #[error("checker failed: {0}")]
    Failed(String),
}

impl From<FairError> for ApiError {
    fn from(e: FairError) -> Self {
        match e {
            FairError::NoDefaultBranch(_) => ApiError::skip(e.to_string()),
            FairError::RateLimited(_) => ApiError::status(429, e.to_string()),
            FairError::Timeout(_) => ApiError::transport(e.to_string()),
            FairError::Failed(message) => ApiError::from_message(message),
        }
    }
}

/// Checks one repository URL.
#[async_trait]
pub trait FairChecker: Send + Sync {
    async fn check(&self, url: &str) -> Result<FairCompliance, FairError>;
}

/// Runs an external command with the repository URL appended and reads a
/// JSON array of five booleans from the last line of its stdout.
#[derive(Debug, Clone)]
pub struct CommandFairChecker {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandFairChecker {
    /// Default per-repository time limit.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Split a whitespace-separated command line. Returns `None` if blank.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(String::from);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn classify_failure(stderr: &str) -> FairError {
    let lower = stderr.to_ascii_lowercase();
    let message = stderr.trim().to_string();
    if lower.contains("default branch") {
        FairError::NoDefaultBranch(message)
    } else if lower.contains("rate limit") || matches!(sniff_status(stderr), Some(403 | 429)) {
        FairError::RateLimited(message)
    } else {
        FairError::Failed(message)
    }
}

fn parse_compliance(stdout: &str) -> Result<FairCompliance, FairError> {
    let line = stdout
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| FairError::Failed("checker printed nothing".to_string()))?;
    let values: Vec<bool> = serde_json::from_str(line.trim())
        .map_err(|e| FairError::Failed(format!("unexpected checker output {line:?}: {e}")))?;
    let values: [bool; 5] = values
        .try_into()
        .map_err(|v: Vec<bool>| FairError::Failed(format!("expected 5 values, got {}", v.len())))?;
    Ok(FairCompliance::from_array(values))
}

#[async_trait]
impl FairChecker for CommandFairChecker {
    async fn check(&self, url: &str) -> Result<FairCompliance, FairError> {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(url)
            .kill_on_drop(true)
            .output();
        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| FairError::Timeout(self.timeout))?
            .map_err(|e| FairError::Failed(format!("cannot run {}: {e}", self.program)))?;

        if !output.status.success() {
            return Err(classify_failure(&String::from_utf8_lossy(&output.stderr)));
        }
        parse_compliance(&String::from_utf8_lossy(&output.stdout))
    }
}

/// FAIR-compliance row for a repository.
pub struct FairCollector {
    checker: Arc<dyn FairChecker>,
}

impl FairCollector {
    pub fn new(checker: Arc<dyn FairChecker>) -> Self {
        Self { checker }
    }
}

#[async_trait]
impl Collector for FairCollector {
    type Target = RepoId;

    fn kind(&self) -> VariableKind {
        VariableKind::Fair
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    async fn collect(&self, repo: &RepoId) -> Result<Vec<Record>, ApiError> {
        let url = repo.html_url();
        let compliance = self.checker.check(&url).await?;
        Ok(vec![Record::new(
            repo.key(),
            compliance.values().iter().map(bool::to_string).collect(),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FailureKind;

    fn sh(script: &str) -> CommandFairChecker {
        CommandFairChecker::new(
            "sh",
            vec!["-c".to_string(), script.to_string(), "fair".to_string()],
        )
    }

    struct FixedChecker(Result<[bool; 5], fn() -> FairError>);

    #[async_trait]
    impl FairChecker for FixedChecker {
        async fn check(&self, _url: &str) -> Result<FairCompliance, FairError> {
            match &self.0 {
                Ok(values) => Ok(FairCompliance::from_array(*values)),
                Err(make) => Err(make()),
            }
        }
    }

    #[test]
    fn test_error_mapping() {
        let skip: ApiError = FairError::NoDefaultBranch("x".into()).into();
        assert_eq!(skip.kind(), FailureKind::Skip);

        let quota: ApiError = FairError::RateLimited("x".into()).into();
        assert_eq!(quota.kind(), FailureKind::QuotaExhausted);

        let timeout: ApiError = FairError::Timeout(Duration::from_secs(1)).into();
        assert_eq!(timeout.kind(), FailureKind::Transient);

        let gone: ApiError = FairError::Failed("HTTP Error 404: Not Found".into()).into();
        assert_eq!(gone.kind(), FailureKind::NotFound);
    }

    #[test]
    fn test_classify_failure() {
        assert!(matches!(
            classify_failure("Repository does not have a default branch"),
            FairError::NoDefaultBranch(_)
        ));
        assert!(matches!(
            classify_failure("API rate limit exceeded"),
            FairError::RateLimited(_)
        ));
        assert!(matches!(classify_failure("segfault"), FairError::Failed(_)));
    }

    #[test]
    fn test_parse_compliance_uses_last_line() {
        let parsed = parse_compliance("checking...\n[true, false, true, false, true]\n\n").unwrap();
        assert_eq!(parsed.values(), [true, false, true, false, true]);

        assert!(parse_compliance("[true, false]").is_err());
        assert!(parse_compliance("").is_err());
    }

    #[test]
    fn test_from_command_line() {
        let checker = CommandFairChecker::from_command_line("python -m fair_check").unwrap();
        assert_eq!(checker.program, "python");
        assert_eq!(checker.args, vec!["-m", "fair_check"]);
        assert!(CommandFairChecker::from_command_line("   ").is_none());
    }

    #[tokio::test]
    async fn test_command_checker_success() {
        let checker = sh("echo \"[true, true, false, false, true]\"");
        let result = checker.check("https://github.com/o/r").await.unwrap();
        assert_eq!(result.values(), [true, true, false, false, true]);
    }

    #[tokio::test]
    async fn test_command_checker_receives_url() {
        let checker = sh("case \"$1\" in https://github.com/o/r) echo '[true,true,true,true,true]';; *) exit 3;; esac");
        let result = checker.check("https://github.com/o/r").await.unwrap();
        assert_eq!(result.values(), [true; 5]);
    }

    #[tokio::test]
    async fn test_command_checker_no_default_branch() {
        let checker = sh("echo 'repository has no default branch' >&2; exit 1");
        let err = checker.check("https://github.com/o/r").await.unwrap_err();
        assert!(matches!(err, FairError::NoDefaultBranch(_)));
    }

    #[tokio::test]
    async fn test_command_checker_timeout() {
        let checker = sh("sleep 5").with_timeout(Duration::from_millis(50));
        let err = checker.check("https://github.com/o/r").await.unwrap_err();
        assert!(matches!(err, FairError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_collector_rows_and_skip() {
        let repo = RepoId::new("o", "r").unwrap();

        let collector = FairCollector::new(Arc::new(FixedChecker(Ok([true, false, false, true, false]))));
        let records = collector.collect(&repo).await.unwrap();
        assert_eq!(records[0].values, vec!["true", "false", "false", "true", "false"]);

        let collector = FairCollector::new(Arc::new(FixedChecker(Err(|| {
            FairError::NoDefaultBranch("o/r".to_string())
        }))));
        let err = collector.collect(&repo).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Skip);
    }
}
