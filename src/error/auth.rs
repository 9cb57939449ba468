use super::{OauthError, RetryError, StoreError};
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum SecretError {
    #[error("failed to read secret {namespace}/{name} key {key:?}: {source}")]
    Read {
        namespace: String,
        name: String,
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("secret {namespace}/{name} key {key:?} is empty")]
    Empty {
        namespace: String,
        name: String,
        key: String,
    },
}

#[derive(Debug, ThisError)]
pub enum AuthError {
    #[error("failed to fetch API token: {0}")]
    Secret(#[from] SecretError),

    #[error("auth token refresh failed: {0}")]
    Refresh(#[from] RetryError<OauthError>),

    #[error("shared credential store error: {0}")]
    Store(#[from] StoreError),

    #[error("gave up storing shared credential after {attempts} conflicting writes")]
    ConflictRetriesExhausted { attempts: u32 },

    /// Construction-time refresh failed; the API token is unusable.
    #[error("validating API token validity: {0}")]
    Validation(#[source] Box<AuthError>),
}

impl AuthError {
    pub fn is_cancelled(&self) -> bool {
        match self {
            AuthError::Refresh(e) => e.is_cancelled(),
            AuthError::Validation(inner) => inner.is_cancelled(),
            _ => false,
        }
    }
}
