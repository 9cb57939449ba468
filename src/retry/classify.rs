use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;

/// Statuses worth another attempt.
pub const RETRYABLE_STATUSES: [StatusCode; 4] = [
    StatusCode::REQUEST_TIMEOUT,
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
];

/// Retry verdict for a completed HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// `retry_after` is set only when the server sent an integer `Retry-After`.
    Retryable { retry_after: Option<Duration> },
    NotRetryable,
}

impl StatusClass {
    pub fn classify(status: StatusCode, headers: &HeaderMap) -> Self {
        match Self::of_status(status) {
            Self::Retryable { .. } => Self::Retryable {
                retry_after: parse_retry_after(headers),
            },
            Self::NotRetryable => Self::NotRetryable,
        }
    }

    /// Classification when no headers are at hand.
    pub fn of_status(status: StatusCode) -> Self {
        if RETRYABLE_STATUSES.contains(&status) {
            Self::Retryable { retry_after: None }
        } else {
            Self::NotRetryable
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. })
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Retryable { retry_after } => *retry_after,
            Self::NotRetryable => None,
        }
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
