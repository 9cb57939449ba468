use super::clock::Clock;
use super::credential::Credential;
use super::issuer::TokenIssuer;
use crate::config::AuthConfig;
use crate::error::{IsRetryable, OauthError, RetryError};
use crate::retry::{Attempt, DelayPolicy, RetryEngine, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Name under which refresh retries are logged.
pub const REFRESH_RETRY_NAME: &str = "auth token refresh";

/// How access tokens are refreshed and how long they are trusted.
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub max_age: Duration,
    pub policy: RetryPolicy,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(600),
            policy: RetryPolicy::new(
                REFRESH_RETRY_NAME,
                3,
                DelayPolicy::increment(Duration::from_secs(5), Duration::from_secs(5)),
            ),
        }
    }
}

impl From<&AuthConfig> for RefreshSettings {
    fn from(cfg: &AuthConfig) -> Self {
        Self {
            max_age: Duration::from_secs(cfg.token_max_age_secs),
            policy: RetryPolicy::new(
                REFRESH_RETRY_NAME,
                cfg.refresh_max_attempts,
                DelayPolicy::increment(
                    Duration::from_secs(cfg.refresh_base_delay_secs),
                    Duration::from_secs(cfg.refresh_step_secs),
                ),
            ),
        }
    }
}

/// Obtains fresh credentials from the issuer under the refresh retry policy.
pub(crate) struct TokenRefresher {
    api_token: String,
    issuer: Arc<dyn TokenIssuer>,
    clock: Arc<dyn Clock>,
    settings: RefreshSettings,
}

impl TokenRefresher {
    pub(crate) fn new(
        api_token: String,
        issuer: Arc<dyn TokenIssuer>,
        clock: Arc<dyn Clock>,
        settings: RefreshSettings,
    ) -> Self {
        Self {
            api_token,
            issuer,
            clock,
            settings,
        }
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) async fn refresh(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Credential, RetryError<OauthError>> {
        let mut engine = RetryEngine::new(self.settings.policy.clone());
        let this = self;
        engine.run(cancel, move || async move { this.attempt().await }).await
    }

    async fn attempt(&self) -> Attempt<Credential, OauthError> {
        let requested_at = self.clock.now();
        match self.issuer.issue(&self.api_token).await {
            Ok(issued) => {
                let lifetime = issued.lifetime();
                let credential = Credential::issued(
                    issued.access_token,
                    lifetime,
                    self.settings.max_age,
                    requested_at,
                );
                info!(
                    expires_at = %credential.expires_at(),
                    granted_secs = issued.expires_in,
                    "refreshed governor access token"
                );
                Attempt::Success(credential)
            }
            Err(e) if e.is_retryable() => {
                warn!(error = %e, "access token request failed; will retry");
                Attempt::Retryable {
                    retry_after: e.retry_after(),
                }
            }
            Err(e) => Attempt::Fatal(e),
        }
    }
}

impl std::fmt::Debug for TokenRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRefresher")
            .field("clock", &self.clock)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
