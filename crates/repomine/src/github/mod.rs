//! GitHub REST adapter.
//!
//! # Module Structure
//!
//! - [`client`] - [`GitHubClient`], the [`ApiClient`](crate::api::ApiClient) implementation
//! - [`error`] - Mapping of HTTP responses onto [`ApiError`](crate::api::ApiError)
//! - [`types`] - Payload structs deserialized by the collectors
//!
//! ```ignore
//! use repomine::github::GitHubClient;
//!
//! let client = GitHubClient::new(Some(token))?;
//! let status = client.rate_limit().await?;
//! ```

mod client;
mod error;
pub mod types;

pub use client::{DEFAULT_API_URL, GitHubClient, LinkPagination, USER_AGENT, parse_link_header};
pub use error::{reset_from_headers, status_error};
pub use types::{GitHubRateLimitResponse, GitHubRateLimits, RateLimitResource};
