use crate::config::AuthConfig;
use crate::error::OauthError;
use crate::retry::StatusClass;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

const ISSUER_USER_AGENT: &str = concat!("inspector-governor/", env!("CARGO_PKG_VERSION"));

/// Token endpoint grant.
#[derive(Debug, Clone, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    /// Seconds until the token expires.
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

impl IssuedToken {
    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.expires_in)
    }
}

/// Exchanges a long-lived API token for a short-lived access token.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(&self, api_token: &str) -> Result<IssuedToken, OauthError>;
}

/// Form-encoded `refresh_token` grant against the CSP authorize endpoint.
#[derive(Debug, Clone)]
pub struct HttpTokenIssuer {
    client: reqwest::Client,
    token_url: Url,
}

impl HttpTokenIssuer {
    pub fn new(client: reqwest::Client, token_url: Url) -> Self {
        Self { client, token_url }
    }

    pub fn from_config(cfg: &AuthConfig) -> Result<Self, OauthError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(ISSUER_USER_AGENT)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30));

        if let Some(proxy_url) = cfg.proxy.as_ref() {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
        }

        Ok(Self::new(builder.build()?, cfg.token_url.clone()))
    }

    pub fn token_url(&self) -> &Url {
        &self.token_url
    }
}

#[async_trait]
impl TokenIssuer for HttpTokenIssuer {
    async fn issue(&self, api_token: &str) -> Result<IssuedToken, OauthError> {
        debug!(url = %self.token_url, "requesting access token");
        let resp = self
            .client
            .post(self.token_url.clone())
            .form(&[("refresh_token", api_token)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = StatusClass::classify(status, resp.headers()).retry_after();
            return Err(OauthError::UpstreamStatus {
                status,
                retry_after,
            });
        }

        let body = resp.bytes().await?;
        let issued: IssuedToken =
            serde_json::from_slice(&body).map_err(|e| OauthError::parse(&e, &body))?;
        if issued.access_token.is_empty() {
            return Err(OauthError::MissingAccessToken);
        }
        Ok(issued)
    }
}
