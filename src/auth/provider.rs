use super::BearerTokenProvider;
use super::clock::Clock;
use super::credential::Credential;
use super::issuer::TokenIssuer;
use super::refresh::{RefreshSettings, TokenRefresher};
use super::secret::{SecretRef, SecretStore, read_api_token};
use crate::error::AuthError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Process-local bearer token cache in front of a [`TokenIssuer`].
#[derive(Debug)]
pub struct CredentialProvider {
    refresher: TokenRefresher,
    cached: Mutex<Option<Credential>>,
}

impl CredentialProvider {
    /// Builds a provider with an empty cache; the first `bearer_token` call refreshes.
    pub fn new(
        api_token: impl Into<String>,
        issuer: Arc<dyn TokenIssuer>,
        clock: Arc<dyn Clock>,
        settings: RefreshSettings,
    ) -> Self {
        Self {
            refresher: TokenRefresher::new(api_token.into(), issuer, clock, settings),
            cached: Mutex::new(None),
        }
    }

    /// Reads the API token from `secrets` and proves it by refreshing once.
    ///
    /// Any failure on the way fails construction.
    pub async fn from_secret(
        secrets: &dyn SecretStore,
        secret: &SecretRef,
        issuer: Arc<dyn TokenIssuer>,
        clock: Arc<dyn Clock>,
        settings: RefreshSettings,
        cancel: &CancellationToken,
    ) -> Result<Self, AuthError> {
        let api_token = read_api_token(secrets, secret).await?;
        let provider = Self::new(api_token, issuer, clock, settings);

        let credential = provider
            .refresher
            .refresh(cancel)
            .await
            .map_err(|e| AuthError::Validation(Box::new(e.into())))?;
        info!(
            namespace = %secret.namespace,
            name = %secret.name,
            "API token validated"
        );
        *provider.cached.lock().await = Some(credential);
        Ok(provider)
    }

    pub async fn cached_credential(&self) -> Option<Credential> {
        self.cached.lock().await.clone()
    }
}

#[async_trait]
impl BearerTokenProvider for CredentialProvider {
    async fn bearer_token(&self, cancel: &CancellationToken) -> Result<String, AuthError> {
        let mut cached = self.cached.lock().await;

        let now = self.refresher.clock().now();
        if let Some(credential) = cached.as_ref().filter(|c| c.is_usable_at(now)) {
            return Ok(credential.token().to_string());
        }

        debug!("cached access token missing or expired; refreshing");
        let credential = self.refresher.refresh(cancel).await?;
        let token = credential.token().to_string();
        *cached = Some(credential);
        Ok(token)
    }
}
