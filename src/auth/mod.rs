//! Bearer tokens for the governor API.
//!
//! Layout:
//! - `secret.rs`: API token lookup from mounted secrets
//! - `issuer.rs`: API token to access token exchange
//! - `refresh.rs`: issuer calls under the refresh retry policy
//! - `provider.rs`: process-local cache
//! - `shared.rs`: cache shared across replicas through a record store

mod clock;
mod credential;
mod issuer;
mod provider;
mod refresh;
mod secret;
mod shared;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credential::{Credential, EXPIRY_KEY, TOKEN_KEY};
pub use issuer::{HttpTokenIssuer, IssuedToken, TokenIssuer};
pub use provider::CredentialProvider;
pub use refresh::{REFRESH_RETRY_NAME, RefreshSettings};
pub use secret::{MountedSecretStore, SecretRef, SecretStore, read_api_token};
pub use shared::{MAX_WRITE_ROUNDS, SharedCredentialProvider};

use crate::error::AuthError;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Supplies the bearer token for governor API calls.
#[async_trait]
pub trait BearerTokenProvider: Send + Sync {
    /// Returns a usable token, refreshing it first when needed.
    async fn bearer_token(&self, cancel: &CancellationToken) -> Result<String, AuthError>;
}
