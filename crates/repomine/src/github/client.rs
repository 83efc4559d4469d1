//! GitHub REST client implementing [`ApiClient`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use super::error::status_error;
use super::types::GitHubRateLimitResponse;
use crate::api::{ApiClient, ApiError, ListPage, PageRequest, Query, RateLimitStatus, decode};
use crate::http::{HttpRequest, HttpResponse, HttpTransport};

/// Public GitHub API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("repomine/", env!("CARGO_PKG_VERSION"));

/// Pagination information extracted from GitHub's Link header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPagination {
    /// The last page number (from rel="last" link).
    pub last_page: Option<u32>,
    /// The next page number (from rel="next" link).
    pub next_page: Option<u32>,
}

/// Parse the Link header to extract pagination info.
///
/// GitHub Link headers look like:
/// `<https://api.github.com/user/123/repos?per_page=100&page=2>; rel="next", <...&page=3>; rel="last"`
pub fn parse_link_header(link_header: &str) -> LinkPagination {
    let mut info = LinkPagination::default();

    for part in link_header.split(',') {
        let part = part.trim();

        let mut url = None;
        let mut rel = None;

        for segment in part.split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some(rel_value) = segment.strip_prefix("rel=") {
                rel = Some(rel_value.trim_matches('"'));
            }
        }

        if let (Some(url), Some(rel_type)) = (url, rel)
            && let Some(page_num) = extract_page_from_url(url)
        {
            match rel_type {
                "last" => info.last_page = Some(page_num),
                "next" => info.next_page = Some(page_num),
                _ => {}
            }
        }
    }

    info
}

/// Extract the page parameter from a URL.
fn extract_page_from_url(url: &str) -> Option<u32> {
    let query_start = url.find('?')?;
    let query = &url[query_start + 1..];

    for param in query.split('&') {
        if let Some(value) = param.strip_prefix("page=") {
            return value.parse().ok();
        }
    }

    None
}

/// GitHub API client.
///
/// Holds no global state: the token and transport are injected, so tests
/// can drive it with an in-memory transport.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    token: Option<Arc<String>>,
}

impl GitHubClient {
    /// Create a client backed by reqwest.
    ///
    /// Without a token the API allows far fewer requests per hour.
    #[cfg(feature = "github")]
    pub fn new(token: Option<String>) -> Result<Self, ApiError> {
        use crate::http::reqwest_transport::ReqwestTransport;

        let transport = ReqwestTransport::with_timeout(std::time::Duration::from_secs(30))?;
        Ok(Self::with_transport(Arc::new(transport), token))
    }

    /// Create a client over an arbitrary transport.
    pub fn with_transport(transport: Arc<dyn HttpTransport>, token: Option<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_API_URL.to_string(),
            token: token.filter(|t| !t.is_empty()).map(Arc::new),
        }
    }

    /// Point the client at a different API root (e.g. GitHub Enterprise).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether requests are authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, route: &str, query: &Query) -> Result<String, ApiError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, route))
            .map_err(|e| ApiError::transport(format!("invalid URL for {route}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }
        Ok(url.into())
    }

    async fn send(&self, route: &str, query: &Query) -> Result<HttpResponse, ApiError> {
        let url = self.url(route, query)?;

        let mut headers = vec![
            (
                "Accept".to_string(),
                "application/vnd.github+json".to_string(),
            ),
            ("User-Agent".to_string(), USER_AGENT.to_string()),
            ("X-GitHub-Api-Version".to_string(), "2022-11-28".to_string()),
        ];
        if let Some(token) = &self.token {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        tracing::trace!(url = %url, "GET");
        let response = self.transport.send(HttpRequest { url, headers }).await?;

        // 204 is how GitHub answers for empty repositories; the pipeline
        // treats it like a missing resource.
        if !response.is_success() || response.status == 204 {
            return Err(status_error(&response, route));
        }
        Ok(response)
    }

    fn parse_body(response: &HttpResponse) -> Result<Value, ApiError> {
        serde_json::from_slice(&response.body).map_err(|e| ApiError::decode(e.to_string()))
    }

    /// Fetch every rate limit resource (for display).
    pub async fn rate_limits(&self) -> Result<GitHubRateLimitResponse, ApiError> {
        let value = self.get("/rate_limit", &Query::new()).await?;
        decode(value)
    }
}

#[async_trait]
impl ApiClient for GitHubClient {
    async fn list_page(
        &self,
        route: &str,
        query: &Query,
        page: PageRequest,
    ) -> Result<ListPage<Value>, ApiError> {
        let mut query = query.clone();
        query.push(("per_page".to_string(), page.per_page.to_string()));
        query.push(("page".to_string(), page.page.to_string()));

        let response = self.send(route, &query).await?;
        let last_page = response
            .header("link")
            .and_then(|h| parse_link_header(h).last_page)
            .unwrap_or(0);

        match Self::parse_body(&response)? {
            Value::Array(items) => Ok(ListPage { items, last_page }),
            other => Err(ApiError::decode(format!(
                "expected a JSON array from {route}, got {}",
                json_type(&other)
            ))),
        }
    }

    async fn get(&self, route: &str, query: &Query) -> Result<Value, ApiError> {
        let response = self.send(route, query).await?;
        Self::parse_body(&response)
    }

    async fn rate_limit(&self) -> Result<RateLimitStatus, ApiError> {
        let limits = self.rate_limits().await?;
        Ok(limits.resources.core.to_status())
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
