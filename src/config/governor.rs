use serde::{Deserialize, Serialize};
use url::Url;

/// Governor telemetry endpoint configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GovernorConfig {
    /// Base API URL; telemetry is posted to `{api_url}/v1/clusters/{cluster_id}/telemetry`.
    /// TOML: `governor.api_url`.
    #[serde(default = "default_api_url")]
    pub api_url: Url,

    /// Cluster the reports belong to (required, non-empty).
    /// TOML: `governor.cluster_id`.
    #[serde(default)]
    pub cluster_id: String,

    /// Optional HTTP proxy for telemetry requests.
    /// TOML: `governor.proxy`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// Whole-request timeout.
    /// TOML: `governor.timeout_secs`. Default: `30`.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Allow HTTP/2 multiplexing for reqwest clients; disabled forces HTTP/1.
    /// TOML: `governor.enable_multiplexing`. Default: `false`.
    #[serde(default)]
    pub enable_multiplexing: bool,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            cluster_id: String::new(),
            proxy: None,
            timeout_secs: default_timeout_secs(),
            enable_multiplexing: false,
        }
    }
}

fn default_api_url() -> Url {
    Url::parse("https://api.governor.tanzu.vmware.com/").expect("valid default api url")
}

fn default_timeout_secs() -> u64 {
    30
}
