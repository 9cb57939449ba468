mod auth;
mod basic;
mod governor;

pub use auth::{AuthConfig, SharedStoreConfig};
pub use basic::BasicConfig;
pub use governor::GovernorConfig;

use crate::error::ConfigError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Process-level settings (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Token issuer, API token secret and shared cache settings (see `auth` table).
    #[serde(default)]
    pub auth: AuthConfig,

    /// Telemetry endpoint settings (see `governor` table).
    #[serde(default)]
    pub governor: GovernorConfig,
}

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Environment overrides use this prefix with `__` between table and key,
/// e.g. `GOVERNOR_AUTH__SECRET_NAME`.
const ENV_PREFIX: &str = "GOVERNOR_";

impl Config {
    /// Builds a Figment that merges defaults, an optional TOML file and environment overrides.
    pub fn figment(path: &Path) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if path.is_file() {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads and validates configuration from `path` (if present) plus environment.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let cfg: Self = Self::figment(path)
            .extract()
            .map_err(|e| ConfigError::Extract(Box::new(e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects settings that would only fail later, at first use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.governor.cluster_id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "governor.cluster_id must be set and non-empty".to_string(),
            ));
        }
        if self.auth.secret_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "auth.secret_name must be set and non-empty".to_string(),
            ));
        }
        if self.auth.refresh_max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "auth.refresh_max_attempts must be at least 1".to_string(),
            ));
        }
        if self.auth.shared.enabled && self.auth.shared.record_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "auth.shared.record_name must be set when the shared store is enabled"
                    .to_string(),
            ));
        }
        Ok(())
    }
}
