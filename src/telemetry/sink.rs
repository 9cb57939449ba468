use super::payload::TelemetryPayload;
use crate::config::GovernorConfig;
use crate::error::{BoxError, ExportError};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{CONNECTION, HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::debug;
use url::Url;

const SINK_USER_AGENT: &str = concat!("inspector-governor/", env!("CARGO_PKG_VERSION"));

/// Completed telemetry call, whatever its status.
#[derive(Debug, Clone)]
pub struct SinkResponse {
    pub status: StatusCode,
    /// Status line text, e.g. `503 Service Unavailable`.
    pub status_text: String,
    pub headers: HeaderMap,
}

impl SinkResponse {
    pub fn new(status: StatusCode, headers: HeaderMap) -> Self {
        Self {
            status,
            status_text: status.to_string(),
            headers,
        }
    }
}

/// Delivers telemetry for one cluster.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// `Err` is reserved for transport failures; any HTTP status is a response.
    async fn post(&self, payload: &TelemetryPayload, token: &str)
    -> Result<SinkResponse, BoxError>;
}

/// `POST {api_url}/v1/clusters/{cluster_id}/telemetry` with bearer auth.
#[derive(Debug, Clone)]
pub struct HttpTelemetrySink {
    client: reqwest::Client,
    url: Url,
}

impl HttpTelemetrySink {
    pub fn new(
        client: reqwest::Client,
        api_url: &Url,
        cluster_id: &str,
    ) -> Result<Self, ExportError> {
        Ok(Self {
            client,
            url: telemetry_url(api_url, cluster_id)?,
        })
    }

    pub fn from_config(cfg: &GovernorConfig) -> Result<Self, ExportError> {
        let mut headers = HeaderMap::new();
        let mut builder = reqwest::Client::builder()
            .user_agent(SINK_USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(cfg.timeout_secs));

        if let Some(proxy_url) = cfg.proxy.as_ref() {
            let proxy = reqwest::Proxy::all(proxy_url.as_str())
                .map_err(|e| ExportError::Transport(e.into()))?;
            builder = builder.proxy(proxy);
        }

        if !cfg.enable_multiplexing {
            headers.insert(CONNECTION, HeaderValue::from_static("close"));

            builder = builder
                .http1_only()
                .pool_max_idle_per_host(0)
                .pool_idle_timeout(Duration::from_secs(0));
        } else {
            builder = builder.http2_adaptive_window(true);
        }

        let client = builder
            .default_headers(headers)
            .build()
            .map_err(|e| ExportError::Transport(e.into()))?;

        Self::new(client, &cfg.api_url, &cfg.cluster_id)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl TelemetrySink for HttpTelemetrySink {
    async fn post(
        &self,
        payload: &TelemetryPayload,
        token: &str,
    ) -> Result<SinkResponse, BoxError> {
        debug!(url = %self.url, workloads = payload.workloads.len(), "posting telemetry");
        let resp = self
            .client
            .post(self.url.clone())
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;

        Ok(SinkResponse::new(resp.status(), resp.headers().clone()))
    }
}

fn telemetry_url(api_url: &Url, cluster_id: &str) -> Result<Url, ExportError> {
    let mut url = api_url.clone();
    url.path_segments_mut()
        .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(["v1", "clusters", cluster_id, "telemetry"]);
    Ok(url)
}
