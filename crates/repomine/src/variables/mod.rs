//! Variable collectors.
//!
//! A collector knows how to turn one resource into the rows of one output
//! table. Collectors only fetch and reshape; retries, pacing and persistence
//! are the batch driver's business.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::api::ApiError;
use crate::record::{Record, Schema};
use crate::resource::Resource;

mod commits;
mod contributors;
mod fair;
mod languages;
mod notebooks;
mod readmes;
mod repositories;
mod topics;
mod users;

pub use commits::CommitsCollector;
pub use contributors::ContributorsCollector;
pub use fair::{CommandFairChecker, FairChecker, FairCollector, FairCompliance, FairError};
pub use languages::LanguagesCollector;
pub use notebooks::{DEFAULT_BRANCH, NotebooksCollector};
pub use readmes::{ReadmeSignals, ReadmesCollector};
pub use repositories::RepositoriesCollector;
pub use topics::TopicsCollector;
pub use users::UsersCollector;

/// Fetches one variable type for one resource.
#[async_trait]
pub trait Collector: Send + Sync {
    /// The kind of resource this collector reads.
    type Target: Resource;

    fn kind(&self) -> VariableKind;

    fn schema(&self) -> &'static Schema;

    /// Fetch and reshape. An empty result is a valid success.
    async fn collect(&self, target: &Self::Target) -> Result<Vec<Record>, ApiError>;
}

/// What a variable type is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Repository,
    User,
}

/// The variable types the pipeline can collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    Contributors,
    Languages,
    JupyterNotebooks,
    Commits,
    Readmes,
    Topics,
    Fair,
    Repositories,
    Users,
}

impl VariableKind {
    pub const ALL: [VariableKind; 9] = [
        Self::Contributors,
        Self::Languages,
        Self::JupyterNotebooks,
        Self::Commits,
        Self::Readmes,
        Self::Topics,
        Self::Fair,
        Self::Repositories,
        Self::Users,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contributors => "contributors",
            Self::Languages => "languages",
            Self::JupyterNotebooks => "jupyter_notebooks",
            Self::Commits => "commits",
            Self::Readmes => "readmes",
            Self::Topics => "topics",
            Self::Fair => "fair",
            Self::Repositories => "repositories",
            Self::Users => "users",
        }
    }

    pub fn target(&self) -> TargetKind {
        match self {
            Self::Repositories | Self::Users => TargetKind::User,
            _ => TargetKind::Repository,
        }
    }

    pub fn schema(&self) -> &'static Schema {
        match self {
            Self::Contributors => &contributors::SCHEMA,
            Self::Languages => &languages::SCHEMA,
            Self::JupyterNotebooks => &notebooks::SCHEMA,
            Self::Commits => &commits::SCHEMA,
            Self::Readmes => &readmes::SCHEMA,
            Self::Topics => &topics::SCHEMA,
            Self::Fair => &fair::SCHEMA,
            Self::Repositories => &repositories::SCHEMA,
            Self::Users => &users::SCHEMA,
        }
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariableKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "notebooks" => return Ok(Self::JupyterNotebooks),
            "readme" => return Ok(Self::Readmes),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(VariableKind::as_str).collect();
                format!("unknown variable '{s}' (expected one of: {})", known.join(", "))
            })
    }
}
