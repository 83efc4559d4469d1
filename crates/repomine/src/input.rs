//! Readers for the tables produced by earlier pipeline stages.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::resource::{RepoId, ResourceError, UserId};

/// Errors raised while reading an input table.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: {source}")]
    InvalidRow {
        row: usize,
        #[source]
        source: ResourceError,
    },
}

fn open(path: &Path) -> Result<File, InputError> {
    File::open(path).map_err(|source| InputError::Open {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Deserialize)]
struct RepositoryRow {
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    default_branch: Option<String>,
}

impl RepositoryRow {
    fn into_repo(self) -> Result<RepoId, ResourceError> {
        let repo = match (self.owner, self.name) {
            (Some(owner), Some(name)) if !owner.is_empty() && !name.is_empty() => {
                RepoId::new(owner, name)?
            }
            _ => match self.html_url {
                Some(url) => RepoId::from_url(&url)?,
                None => return Err(ResourceError::InvalidRepo("missing html_url".to_string())),
            },
        };
        Ok(match self.default_branch {
            Some(branch) => repo.with_branch(branch),
            None => repo,
        })
    }
}

#[derive(Debug, Deserialize)]
struct UserRow {
    user_id: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    final_decision: Option<f64>,
}

/// Read the repositories table.
///
/// Uses `owner`/`name` when present, else parses `html_url`. Repeated
/// repositories are kept once, in first-seen order.
pub fn read_repositories(path: &Path) -> Result<Vec<RepoId>, InputError> {
    read_repositories_from(open(path)?)
}

pub fn read_repositories_from<R: Read>(reader: R) -> Result<Vec<RepoId>, InputError> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut seen = HashSet::new();
    let mut repos = Vec::new();

    for (index, row) in reader.deserialize::<RepositoryRow>().enumerate() {
        let repo = row?
            .into_repo()
            .map_err(|source| InputError::InvalidRow {
                row: index + 1,
                source,
            })?;
        if seen.insert((repo.owner().to_lowercase(), repo.name().to_lowercase())) {
            repos.push(repo);
        }
    }

    tracing::debug!(count = repos.len(), "Read repositories");
    Ok(repos)
}

/// Read the users table.
///
/// Rows whose `final_decision` is 0 were rejected by the affiliation review
/// and are dropped. Repeated users are kept once.
pub fn read_users(path: &Path) -> Result<Vec<UserId>, InputError> {
    read_users_from(open(path)?)
}

pub fn read_users_from<R: Read>(reader: R) -> Result<Vec<UserId>, InputError> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut seen = HashSet::new();
    let mut users = Vec::new();
    let mut rejected = 0usize;

    for (index, row) in reader.deserialize::<UserRow>().enumerate() {
        let row = row?;
        if row.final_decision == Some(0.0) {
            rejected += 1;
            continue;
        }
        let user = UserId::new(row.user_id).map_err(|source| InputError::InvalidRow {
            row: index + 1,
            source,
        })?;
        if seen.insert(user.login().to_lowercase()) {
            users.push(user);
        }
    }

    tracing::debug!(count = users.len(), rejected, "Read users");
    Ok(users)
}
