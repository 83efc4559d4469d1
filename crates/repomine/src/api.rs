//! The upstream API contract.
//!
//! Every fetch in the pipeline goes through an [`ApiClient`]: a paged-list
//! call, a single-resource call, and a rate-limit status call. Adapters (see
//! [`crate::github`]) translate transport failures into [`ApiError`], which
//! carries a status-like code so the retry engine can classify failures
//! without looking at error text.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Query parameters as ordered key/value pairs.
pub type Query = Vec<(String, String)>;

/// Build a [`Query`] from string slices.
pub fn query(pairs: &[(&str, &str)]) -> Query {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A request for one page of a listing endpoint (1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    #[inline]
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }
}

/// One page of a listing endpoint.
///
/// `last_page` is the page count reported by the API. Zero means the
/// response came back in the non-paginated shape, i.e. everything fit on the
/// page that was returned.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub last_page: u32,
}

/// Quota status as reported by the API's rate-limit endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    /// Maximum requests per window.
    pub limit: u64,
    /// Requests left in the current window.
    pub remaining: u64,
    /// When the window resets.
    pub reset_at: DateTime<Utc>,
}

/// How a failed call should be treated by the retry engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The resource is gone or private. Never retried.
    NotFound,
    /// The shared quota is exhausted. Retried after the reset instant.
    QuotaExhausted,
    /// Anything else. Retried on a fixed interval within a budget.
    Transient,
    /// The resource cannot be processed at all. Never retried.
    Skip,
}

/// Errors raised by an [`ApiClient`].
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The API answered with a non-success status.
    #[error("HTTP {code}: {message}")]
    Status {
        code: u16,
        message: String,
        /// Reset instant reported alongside a quota error, if any.
        reset_at: Option<DateTime<Utc>>,
        /// Requests left in the window when the error was returned, if known.
        remaining: Option<u64>,
    },

    /// The request never produced a response.
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The response body did not have the expected shape.
    #[error("Malformed response: {message}")]
    Decode { message: String },

    /// The resource is unprocessable and should be left out.
    #[error("Skipped: {reason}")]
    Skip { reason: String },
}

impl ApiError {
    /// Create a status error.
    #[inline]
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
            reset_at: None,
            remaining: None,
        }
    }

    /// Create a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a decode error.
    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a skip error.
    #[inline]
    pub fn skip(reason: impl Into<String>) -> Self {
        Self::Skip {
            reason: reason.into(),
        }
    }

    /// Build an error from an opaque message, recovering the status code
    /// with [`sniff_status`] when the message carries one.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        match sniff_status(&message) {
            Some(code) => Self::status(code, message),
            None => Self::transport(message),
        }
    }

    /// The status code, when the API returned one.
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The reset instant reported with a quota error.
    pub fn reset_hint(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Status { reset_at, .. } => *reset_at,
            _ => None,
        }
    }

    /// Requests left in the window as reported with the error.
    pub fn remaining_hint(&self) -> Option<u64> {
        match self {
            Self::Status { remaining, .. } => *remaining,
            _ => None,
        }
    }

    /// Classify this error.
    ///
    /// The API answers 403 both for an exhausted quota and for access
    /// restrictions. A 403 that reports requests left in the window is an
    /// access problem and is transient; any other 403 counts as quota.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Status { code: 404 | 204, .. } => FailureKind::NotFound,
            Self::Status {
                code: 403,
                remaining: Some(left),
                ..
            } if *left > 0 => FailureKind::Transient,
            Self::Status { code: 403 | 429, .. } => FailureKind::QuotaExhausted,
            Self::Skip { .. } => FailureKind::Skip,
            _ => FailureKind::Transient,
        }
    }
}

static STATUS_IN_MESSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9])(204|403|404|429)(?:[^0-9]|$)").expect("status pattern is valid")
});

/// Recover a classifiable status code from free-form error text.
///
/// This is the only place in the crate that inspects error messages; it
/// exists for collaborators that report failures as strings.
pub fn sniff_status(message: &str) -> Option<u16> {
    STATUS_IN_MESSAGE
        .captures(message)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Extract a short error message suitable for display.
///
/// Takes the first line of an error message, which keeps log lines compact
/// for errors that embed response bodies.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

/// The remote API as seen by the pipeline.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Fetch one page of a listing endpoint.
    async fn list_page(
        &self,
        route: &str,
        query: &Query,
        page: PageRequest,
    ) -> Result<ListPage<Value>, ApiError>;

    /// Fetch a single resource.
    async fn get(&self, route: &str, query: &Query) -> Result<Value, ApiError>;

    /// Query the live quota status.
    async fn rate_limit(&self) -> Result<RateLimitStatus, ApiError>;
}

#[async_trait]
impl<C: ApiClient + ?Sized> ApiClient for Arc<C> {
    async fn list_page(
        &self,
        route: &str,
        query: &Query,
        page: PageRequest,
    ) -> Result<ListPage<Value>, ApiError> {
        (**self).list_page(route, query, page).await
    }

    async fn get(&self, route: &str, query: &Query) -> Result<Value, ApiError> {
        (**self).get(route, query).await
    }

    async fn rate_limit(&self) -> Result<RateLimitStatus, ApiError> {
        (**self).rate_limit().await
    }
}

/// Deserialize a JSON value into a typed payload, reporting shape mismatches
/// as [`ApiError::Decode`].
pub fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_not_found_statuses() {
        assert_eq!(ApiError::status(404, "gone").kind(), FailureKind::NotFound);
        assert_eq!(ApiError::status(204, "empty").kind(), FailureKind::NotFound);
    }

    #[test]
    fn test_kind_quota_statuses() {
        assert_eq!(
            ApiError::status(403, "forbidden").kind(),
            FailureKind::QuotaExhausted
        );
        assert_eq!(
            ApiError::status(429, "slow down").kind(),
            FailureKind::QuotaExhausted
        );
    }

    #[test]
    fn test_kind_forbidden_with_quota_left_is_transient() {
        let forbidden = |remaining| ApiError::Status {
            code: 403,
            message: "Resource protected by organization SAML enforcement".to_string(),
            reset_at: None,
            remaining,
        };
        assert_eq!(forbidden(Some(4_999)).kind(), FailureKind::Transient);
        assert_eq!(forbidden(Some(0)).kind(), FailureKind::QuotaExhausted);
        assert_eq!(forbidden(None).kind(), FailureKind::QuotaExhausted);
        assert_eq!(forbidden(Some(12)).remaining_hint(), Some(12));
    }

    #[test]
    fn test_kind_everything_else_is_transient() {
        assert_eq!(ApiError::status(500, "oops").kind(), FailureKind::Transient);
        assert_eq!(ApiError::status(409, "empty repo").kind(), FailureKind::Transient);
        assert_eq!(ApiError::transport("reset").kind(), FailureKind::Transient);
        assert_eq!(ApiError::decode("eof").kind(), FailureKind::Transient);
    }

    #[test]
    fn test_kind_skip() {
        assert_eq!(ApiError::skip("no branch").kind(), FailureKind::Skip);
    }

    #[test]
    fn test_sniff_status_finds_standalone_codes() {
        assert_eq!(sniff_status("HTTP Error 404: Not Found"), Some(404));
        assert_eq!(sniff_status("403"), Some(403));
        assert_eq!(sniff_status("status=429, retry later"), Some(429));
    }

    #[test]
    fn test_sniff_status_ignores_embedded_digits() {
        assert_eq!(sniff_status("request id 14045 failed"), None);
        assert_eq!(sniff_status("took 2040ms"), None);
        assert_eq!(sniff_status("connection reset"), None);
    }

    #[test]
    fn test_from_message_uses_sniffed_status() {
        let err = ApiError::from_message("HTTP Error 404: Not Found");
        assert_eq!(err.code(), Some(404));
        assert_eq!(err.kind(), FailureKind::NotFound);

        let err = ApiError::from_message("timed out");
        assert!(matches!(err, ApiError::Transport { .. }));
    }

    #[test]
    fn test_reset_hint() {
        let reset = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let err = ApiError::Status {
            code: 403,
            message: "rate limited".to_string(),
            reset_at: Some(reset),
            remaining: Some(0),
        };
        assert_eq!(err.reset_hint(), Some(reset));
        assert_eq!(ApiError::transport("x").reset_hint(), None);
    }

    #[test]
    fn test_short_error_message_multiline() {
        let err = ApiError::status(500, "first line\nsecond line");
        assert_eq!(short_error_message(&err), "HTTP 500: first line");
    }

    #[test]
    fn test_decode_reports_shape_mismatch() {
        let err = decode::<Vec<u32>>(serde_json::json!({"not": "a list"})).unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[test]
    fn test_query_helper() {
        let q = query(&[("anon", "1"), ("per_page", "100")]);
        assert_eq!(
            q,
            vec![
                ("anon".to_string(), "1".to_string()),
                ("per_page".to_string(), "100".to_string())
            ]
        );
    }
}
