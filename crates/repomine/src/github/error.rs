//! Mapping of GitHub responses onto [`ApiError`].

use chrono::{DateTime, Utc};

use crate::api::ApiError;
use crate::http::{HttpError, HttpResponse};

impl From<HttpError> for ApiError {
    fn from(e: HttpError) -> Self {
        ApiError::transport(e.to_string())
    }
}

/// Reset instant from `x-ratelimit-reset`, if present and parseable.
pub fn reset_from_headers(response: &HttpResponse) -> Option<DateTime<Utc>> {
    response
        .header("x-ratelimit-reset")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
}

/// Requests left from `x-ratelimit-remaining`, if present and parseable.
pub fn remaining_from_headers(response: &HttpResponse) -> Option<u64> {
    response
        .header("x-ratelimit-remaining")
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/// Build an error for a non-success response.
///
/// The message is GitHub's `message` field when the body is JSON, otherwise
/// the raw body. Quota statuses carry the reset instant from the headers.
pub fn status_error(response: &HttpResponse, route: &str) -> ApiError {
    let message = serde_json::from_slice::<serde_json::Value>(&response.body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| String::from_utf8_lossy(&response.body).trim().to_string());
    let message = if message.is_empty() {
        route.to_string()
    } else {
        format!("{message} ({route})")
    };

    let (reset_at, remaining) = match response.status {
        403 | 429 => (reset_from_headers(response), remaining_from_headers(response)),
        _ => (None, None),
    };

    ApiError::Status {
        code: response.status,
        message,
        reset_at,
        remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FailureKind;

    fn response(status: u16, headers: &[(&str, &str)], body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_status_error_uses_github_message() {
        let resp = response(404, &[], r#"{"message":"Not Found"}"#);
        let err = status_error(&resp, "/repos/a/b/languages");
        assert_eq!(err.code(), Some(404));
        assert_eq!(err.kind(), FailureKind::NotFound);
        assert!(err.to_string().contains("Not Found"));
        assert!(err.to_string().contains("/repos/a/b/languages"));
    }

    #[test]
    fn test_status_error_carries_reset_for_quota() {
        let resp = response(
            403,
            &[("X-RateLimit-Reset", "1700000000")],
            r#"{"message":"API rate limit exceeded"}"#,
        );
        let err = status_error(&resp, "/users/x/repos");
        assert_eq!(err.kind(), FailureKind::QuotaExhausted);
        assert_eq!(err.reset_hint().map(|t| t.timestamp()), Some(1_700_000_000));
    }

    #[test]
    fn test_status_error_forbidden_with_quota_left() {
        let resp = response(
            403,
            &[
                ("X-RateLimit-Remaining", "4987"),
                ("X-RateLimit-Reset", "1700000000"),
            ],
            r#"{"message":"Although you appear to have the correct authorization credentials, the organization has enabled OAuth App access restrictions"}"#,
        );
        let err = status_error(&resp, "/repos/org/private/topics");
        assert_eq!(err.remaining_hint(), Some(4987));
        assert_eq!(err.kind(), FailureKind::Transient);
    }

    #[test]
    fn test_status_error_exhausted_quota_stays_quota() {
        let resp = response(
            403,
            &[("x-ratelimit-remaining", "0"), ("x-ratelimit-reset", "1700000000")],
            r#"{"message":"API rate limit exceeded"}"#,
        );
        let err = status_error(&resp, "/users/x/repos");
        assert_eq!(err.remaining_hint(), Some(0));
        assert_eq!(err.kind(), FailureKind::QuotaExhausted);
    }

    #[test]
    fn test_status_error_ignores_reset_for_other_statuses() {
        let resp = response(500, &[("X-RateLimit-Reset", "1700000000")], "boom");
        let err = status_error(&resp, "/x");
        assert_eq!(err.reset_hint(), None);
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_status_error_empty_body_falls_back_to_route() {
        let resp = response(204, &[], "");
        let err = status_error(&resp, "/repos/a/b/contributors");
        assert_eq!(err.kind(), FailureKind::NotFound);
        assert!(err.to_string().contains("/repos/a/b/contributors"));
    }

    #[test]
    fn test_http_error_converts_to_transport() {
        let err: ApiError = HttpError::Transport("connection reset".to_string()).into();
        assert!(matches!(err, ApiError::Transport { .. }));
    }
}
