mod auth;
mod config;
mod export;
mod oauth;
mod retry;
mod store;

pub use auth::{AuthError, SecretError};
pub use config::ConfigError;
pub use export::{BoxError, ExportError};
pub use oauth::OauthError;
pub use retry::RetryError;
pub use store::StoreError;

use std::time::Duration;

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;

    /// Server-suggested wait before the next attempt, if the failure carried one.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}
