use super::{AuthError, IsRetryable};
use crate::retry::StatusClass;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error as ThisError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Everything that can go wrong while exporting one report.
#[derive(Debug, ThisError)]
pub enum ExportError {
    #[error("no provider: telemetry exporter has no bearer token provider configured")]
    NoProvider,

    #[error("no token available")]
    NoToken,

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Network-level failure from the telemetry call itself.
    #[error(transparent)]
    Transport(BoxError),

    #[error("governor api response status: {status_text}")]
    UnexpectedStatus {
        status: StatusCode,
        status_text: String,
        class: StatusClass,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl IsRetryable for ExportError {
    fn is_retryable(&self) -> bool {
        match self {
            ExportError::UnexpectedStatus { class, .. } => class.is_retryable(),
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            ExportError::UnexpectedStatus { class, .. } => class.retry_after(),
            _ => None,
        }
    }
}
