//! GitHub API payload types.
//!
//! Only the fields the collectors read are modelled; everything else in the
//! responses is ignored by serde.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, RateLimitStatus};

/// A single rate limit resource entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitResource {
    /// Maximum requests allowed per period.
    pub limit: u64,
    /// Requests used in current period.
    #[serde(default)]
    pub used: u64,
    /// Remaining requests in current period.
    pub remaining: u64,
    /// Unix timestamp when the rate limit resets.
    pub reset: i64,
}

impl RateLimitResource {
    /// Get the reset time as a DateTime.
    pub fn reset_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.reset, 0).unwrap_or_else(Utc::now)
    }

    /// Convert to the API-agnostic status type.
    pub fn to_status(&self) -> RateLimitStatus {
        RateLimitStatus {
            limit: self.limit,
            remaining: self.remaining,
            reset_at: self.reset_at(),
        }
    }
}

/// Rate limit resources from GitHub's API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRateLimits {
    /// Core API rate limit (non-search REST endpoints).
    pub core: RateLimitResource,
    /// Search API rate limit.
    pub search: RateLimitResource,
    /// GraphQL API rate limit.
    #[serde(default)]
    pub graphql: Option<RateLimitResource>,
    /// Code search API rate limit.
    #[serde(default)]
    pub code_search: Option<RateLimitResource>,
}

/// Full rate limit response from GitHub's API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRateLimitResponse {
    /// All rate limit resources.
    pub resources: GitHubRateLimits,
}

/// A user or organization reference embedded in other payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub login: String,
}

/// An entry from `/repos/{owner}/{repo}/contributors?anon=1`.
///
/// Anonymous contributors have no login, only a name and email.
#[derive(Debug, Clone, Deserialize)]
pub struct Contributor {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub contributions: u64,
}

impl Contributor {
    /// Login for accounts, name or email for anonymous contributors.
    pub fn display_name(&self) -> String {
        self.login
            .clone()
            .or_else(|| self.name.clone())
            .or_else(|| self.email.clone())
            .unwrap_or_default()
    }
}

/// An entry from `/repos/{owner}/{repo}/commits`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitEntry {
    pub sha: String,
    pub commit: CommitDetail,
    #[serde(default)]
    pub author: Option<Account>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub author: Option<CommitSignature>,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitSignature {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl CommitEntry {
    /// Linked account login, falling back to the git author name.
    pub fn author_name(&self) -> String {
        self.author
            .as_ref()
            .map(|a| a.login.clone())
            .or_else(|| self.commit.author.as_ref().and_then(|a| a.name.clone()))
            .unwrap_or_default()
    }

    /// First line of the commit message.
    pub fn summary(&self) -> &str {
        self.commit.message.lines().next().unwrap_or_default()
    }
}

/// A repository license.
#[derive(Debug, Clone, Deserialize)]
pub struct License {
    pub name: String,
}

/// An entry from `/users/{user}/repos`.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub owner: Account,
    pub html_url: String,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub license: Option<License>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
}

/// The payload of `/users/{user}`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub login: String,
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub public_repos: u64,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// The payload of `/repos/{owner}/{repo}/git/trees/{sha}?recursive=1`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitTree {
    pub tree: Vec<TreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TreeEntry {
    pub fn is_blob(&self) -> bool {
        self.kind == "blob"
    }
}

/// The payload of `/repos/{owner}/{repo}/topics`.
#[derive(Debug, Clone, Deserialize)]
pub struct Topics {
    #[serde(default)]
    pub names: Vec<String>,
}

/// The payload of `/repos/{owner}/{repo}/readme`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadmeFile {
    pub content: String,
    pub encoding: String,
}

impl ReadmeFile {
    /// Decode the file body. GitHub wraps base64 content at 60 columns.
    pub fn text(&self) -> Result<String, ApiError> {
        if self.encoding != "base64" {
            return Ok(self.content.clone());
        }
        let compact: String = self
            .content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| ApiError::decode(format!("README is not valid base64: {e}")))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
