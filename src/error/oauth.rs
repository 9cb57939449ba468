use super::IsRetryable;
use crate::retry::StatusClass;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error as ThisError;

const BODY_PREVIEW_CHARS: usize = 100;

/// Failures talking to the token issuer.
#[derive(Debug, ThisError)]
pub enum OauthError {
    #[error("OAuth2 request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("OAuth2 upstream error with status: {status}")]
    UpstreamStatus {
        status: StatusCode,
        retry_after: Option<Duration>,
    },

    #[error("OAuth2 token endpoint parse error: {message}. Body: {body}")]
    Parse { message: String, body: String },

    #[error("OAuth2 token response carried an empty access token")]
    MissingAccessToken,
}

impl OauthError {
    pub(crate) fn parse(err: &serde_json::Error, body: &[u8]) -> Self {
        let body_str = String::from_utf8_lossy(body);
        let body = body_str
            .char_indices()
            .nth(BODY_PREVIEW_CHARS)
            .map(|(idx, _)| format!("{}...<truncated>", &body_str[..idx]))
            .unwrap_or_else(|| body_str.into_owned());
        OauthError::Parse {
            message: err.to_string(),
            body,
        }
    }
}

impl IsRetryable for OauthError {
    fn is_retryable(&self) -> bool {
        match self {
            OauthError::Request(_) | OauthError::Parse { .. } => true,
            OauthError::UpstreamStatus { status, .. } => {
                status.is_server_error() || StatusClass::of_status(*status).is_retryable()
            }
            OauthError::MissingAccessToken => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            OauthError::UpstreamStatus { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
