use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Token issuer and API token secret configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Endpoint exchanging the long-lived API token for a short-lived access token.
    /// TOML: `auth.token_url`.
    #[serde(default = "default_token_url")]
    pub token_url: Url,

    /// Optional HTTP proxy for token requests.
    /// TOML: `auth.proxy`. Example: `http://127.0.0.1:1080`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// Directory where secrets are mounted as `<namespace>/<name>/<key>` files.
    /// TOML: `auth.secret_root`. Default: `/etc/governor/secrets`.
    #[serde(default = "default_secret_root")]
    pub secret_root: PathBuf,

    /// TOML: `auth.secret_namespace`. Default: `cnsi-system`.
    #[serde(default = "default_secret_namespace")]
    pub secret_namespace: String,

    /// Secret holding the API token (required, non-empty).
    /// TOML: `auth.secret_name`.
    #[serde(default)]
    pub secret_name: String,

    /// TOML: `auth.secret_key`. Default: `accessSecret`.
    #[serde(default = "default_secret_key")]
    pub secret_key: String,

    /// Upper bound on a cached access token's lifetime, whatever the issuer grants.
    /// TOML: `auth.token_max_age_secs`. Default: `600`.
    #[serde(default = "default_token_max_age_secs")]
    pub token_max_age_secs: u64,

    /// TOML: `auth.refresh_max_attempts`. Default: `3`.
    #[serde(default = "default_refresh_max_attempts")]
    pub refresh_max_attempts: u32,

    /// Wait before the first refresh retry.
    /// TOML: `auth.refresh_base_delay_secs`. Default: `5`.
    #[serde(default = "default_refresh_delay_secs")]
    pub refresh_base_delay_secs: u64,

    /// Added to the wait on every further refresh retry.
    /// TOML: `auth.refresh_step_secs`. Default: `5`.
    #[serde(default = "default_refresh_delay_secs")]
    pub refresh_step_secs: u64,

    /// Shared token cache (see `auth.shared` table).
    #[serde(default)]
    pub shared: SharedStoreConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_url: default_token_url(),
            proxy: None,
            secret_root: default_secret_root(),
            secret_namespace: default_secret_namespace(),
            secret_name: String::new(),
            secret_key: default_secret_key(),
            token_max_age_secs: default_token_max_age_secs(),
            refresh_max_attempts: default_refresh_max_attempts(),
            refresh_base_delay_secs: default_refresh_delay_secs(),
            refresh_step_secs: default_refresh_delay_secs(),
            shared: SharedStoreConfig::default(),
        }
    }
}

/// Access token cache shared between replicas.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SharedStoreConfig {
    /// TOML: `auth.shared.enabled`. Default: `false`.
    #[serde(default)]
    pub enabled: bool,

    /// SQLite database reachable by every replica.
    /// TOML: `auth.shared.database_url`. Default: `sqlite://governor-tokens.db`.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// TOML: `auth.shared.namespace`. Default: `cnsi-system`.
    #[serde(default = "default_secret_namespace")]
    pub namespace: String,

    /// TOML: `auth.shared.record_name`. Default: `governor-access-token`.
    #[serde(default = "default_record_name")]
    pub record_name: String,
}

impl Default for SharedStoreConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            database_url: default_database_url(),
            namespace: default_secret_namespace(),
            record_name: default_record_name(),
        }
    }
}

fn default_token_url() -> Url {
    Url::parse("https://console.cloud.vmware.com/csp/gateway/am/api/auth/api-tokens/authorize")
        .expect("valid default token url")
}

fn default_secret_root() -> PathBuf {
    PathBuf::from("/etc/governor/secrets")
}

fn default_secret_namespace() -> String {
    "cnsi-system".to_string()
}

fn default_secret_key() -> String {
    "accessSecret".to_string()
}

fn default_token_max_age_secs() -> u64 {
    600
}

fn default_refresh_max_attempts() -> u32 {
    3
}

fn default_refresh_delay_secs() -> u64 {
    5
}

fn default_database_url() -> String {
    "sqlite://governor-tokens.db".to_string()
}

fn default_record_name() -> String {
    "governor-access-token".to_string()
}
