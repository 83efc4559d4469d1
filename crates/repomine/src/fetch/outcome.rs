use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::api::{ApiError, FailureKind};

/// The result of one fetch attempt against one resource.
#[derive(Debug)]
pub enum FetchOutcome<T> {
    /// The fetch produced data.
    Success(T),
    /// The resource is gone or private.
    NotFound,
    /// The quota is exhausted; carries the reset instant when known.
    RateLimited(Option<DateTime<Utc>>),
    /// Anything else that may go away on its own.
    TransientError(ApiError),
    /// The resource cannot be processed and is left out.
    Skipped(String),
}

impl<T> FetchOutcome<T> {
    /// Classify an attempt's result by its error kind.
    pub fn classify(result: Result<T, ApiError>) -> Self {
        let error = match result {
            Ok(value) => return Self::Success(value),
            Err(e) => e,
        };
        match error.kind() {
            FailureKind::NotFound => Self::NotFound,
            FailureKind::QuotaExhausted => Self::RateLimited(error.reset_hint()),
            FailureKind::Skip => match error {
                ApiError::Skip { reason } => Self::Skipped(reason),
                other => Self::Skipped(other.to_string()),
            },
            FailureKind::Transient => Self::TransientError(error),
        }
    }

    /// Whether the outcome settles the resource (no further attempts).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success(_) | Self::NotFound | Self::Skipped(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::NotFound => "not_found",
            Self::RateLimited(_) => "rate_limited",
            Self::TransientError(_) => "transient_error",
            Self::Skipped(_) => "skipped",
        }
    }

    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }
}

/// Escalation from the retry engine.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The transient retry budget ran out.
    #[error("giving up on {resource} after {attempts} attempts: {cause}")]
    Fatal {
        resource: String,
        attempts: u32,
        #[source]
        cause: ApiError,
    },
}

impl FetchError {
    pub fn resource(&self) -> &str {
        match self {
            Self::Fatal { resource, .. } => resource,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::at;

    #[test]
    fn test_classify_success() {
        let outcome = FetchOutcome::classify(Ok(3));
        assert!(outcome.is_terminal());
        assert_eq!(outcome.success(), Some(3));
    }

    #[test]
    fn test_classify_not_found_statuses() {
        for code in [404, 204] {
            let outcome = FetchOutcome::<()>::classify(Err(ApiError::status(code, "gone")));
            assert!(matches!(outcome, FetchOutcome::NotFound), "{code}");
            assert!(outcome.is_terminal());
        }
    }

    #[test]
    fn test_classify_quota_keeps_reset_hint() {
        let outcome = FetchOutcome::<()>::classify(Err(ApiError::Status {
            code: 403,
            message: "limit".to_string(),
            reset_at: Some(at(100)),
            remaining: Some(0),
        }));
        assert!(matches!(outcome, FetchOutcome::RateLimited(Some(t)) if t == at(100)));
        assert!(!outcome.is_terminal());

        let outcome = FetchOutcome::<()>::classify(Err(ApiError::status(429, "slow")));
        assert!(matches!(outcome, FetchOutcome::RateLimited(None)));
    }

    #[test]
    fn test_classify_skip_keeps_reason() {
        let outcome = FetchOutcome::<()>::classify(Err(ApiError::skip("no default branch")));
        match outcome {
            FetchOutcome::Skipped(reason) => assert_eq!(reason, "no default branch"),
            other => panic!("unexpected outcome: {}", other.label()),
        }
    }

    #[test]
    fn test_classify_other_errors_are_transient() {
        let outcome = FetchOutcome::<()>::classify(Err(ApiError::status(502, "bad gateway")));
        assert!(matches!(outcome, FetchOutcome::TransientError(_)));
        assert_eq!(outcome.label(), "transient_error");
    }

    #[test]
    fn test_fatal_error_display() {
        let err = FetchError::Fatal {
            resource: "o/r".to_string(),
            attempts: 121,
            cause: ApiError::transport("connection reset"),
        };
        assert_eq!(err.resource(), "o/r");
        assert!(err.to_string().contains("121 attempts"));
        assert!(err.to_string().contains("connection reset"));
    }
}
