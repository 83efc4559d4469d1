//! Identifiers of the remote resources a batch iterates over.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

/// Errors raised while building an identifier.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("invalid repository identifier: {0}")]
    InvalidRepo(String),

    #[error("invalid user identifier: {0}")]
    InvalidUser(String),
}

/// Something a batch can fetch.
pub trait Resource: fmt::Display + Send + Sync {
    /// The key written to the output table for this resource.
    fn key(&self) -> String;
}

/// A hosted repository: owner, name and an optional branch.
///
/// Immutable once built; used only as a lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    owner: String,
    name: String,
    branch: Option<String>,
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty() && !segment.contains('/') && !segment.chars().any(char::is_whitespace)
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, ResourceError> {
        let owner = owner.into();
        let name = name.into();
        if !valid_segment(&owner) || !valid_segment(&name) {
            return Err(ResourceError::InvalidRepo(format!("{owner}/{name}")));
        }
        Ok(Self {
            owner,
            name,
            branch: None,
        })
    }

    /// Attach a branch. Blank branches are ignored.
    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        let branch = branch.into();
        let branch = branch.trim();
        self.branch = (!branch.is_empty()).then(|| branch.to_string());
        self
    }

    /// Parse a repository page URL such as `https://github.com/owner/name`.
    pub fn from_url(url: &str) -> Result<Self, ResourceError> {
        let invalid = || ResourceError::InvalidRepo(url.to_string());
        let parsed = Url::parse(url.trim()).map_err(|_| invalid())?;
        let mut segments = parsed
            .path_segments()
            .ok_or_else(invalid)?
            .filter(|s| !s.is_empty());
        let owner = segments.next().ok_or_else(invalid)?;
        let name = segments.next().ok_or_else(invalid)?;
        let name = name.strip_suffix(".git").unwrap_or(name);
        Self::new(owner, name).map_err(|_| invalid())
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// Canonical page URL.
    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }

    /// API route below `/repos/{owner}/{name}`.
    pub fn route(&self, suffix: &str) -> String {
        format!("/repos/{}/{}{}", self.owner, self.name, suffix)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoId {
    type Err = ResourceError;

    /// Accepts `owner/name` or a repository URL.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains("://") {
            return Self::from_url(s);
        }
        match s.split_once('/') {
            Some((owner, name)) => {
                Self::new(owner, name).map_err(|_| ResourceError::InvalidRepo(s.to_string()))
            }
            None => Err(ResourceError::InvalidRepo(s.to_string())),
        }
    }
}

impl Resource for RepoId {
    fn key(&self) -> String {
        self.html_url()
    }
}

/// A user account login.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(login: impl Into<String>) -> Result<Self, ResourceError> {
        let login = login.into();
        let trimmed = login.trim();
        if !valid_segment(trimmed) {
            return Err(ResourceError::InvalidUser(login));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn login(&self) -> &str {
        &self.0
    }

    /// API route below `/users/{login}`.
    pub fn route(&self, suffix: &str) -> String {
        format!("/users/{}{}", self.0, suffix)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Resource for UserId {
    fn key(&self) -> String {
        self.0.clone()
    }
}
