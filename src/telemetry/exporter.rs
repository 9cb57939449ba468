use super::payload::TelemetryPayload;
use super::sink::TelemetrySink;
use crate::auth::BearerTokenProvider;
use crate::error::ExportError;
use crate::report::AssessmentReport;
use crate::retry::StatusClass;
use crate::utils::logging::debug_pretty_json;
use reqwest::StatusCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// The only status the telemetry endpoint answers on success.
pub const TELEMETRY_SUCCESS_STATUS: StatusCode = StatusCode::NO_CONTENT;

/// Sends assessment reports to the governor telemetry endpoint.
#[derive(Clone)]
pub struct TelemetryExporter {
    sink: Arc<dyn TelemetrySink>,
    provider: Option<Arc<dyn BearerTokenProvider>>,
}

impl TelemetryExporter {
    /// Exporter without a token provider; every export fails until one is attached.
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            sink,
            provider: None,
        }
    }

    pub fn with_token_provider(mut self, provider: Arc<dyn BearerTokenProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Maps `report` to a payload and posts it once.
    ///
    /// A non-success status is returned as [`ExportError::UnexpectedStatus`] carrying its
    /// retry classification; nothing is retried here.
    pub async fn export(
        &self,
        cancel: &CancellationToken,
        report: &AssessmentReport,
    ) -> Result<(), ExportError> {
        let payload = TelemetryPayload::from_report(report);
        info!(
            workloads = payload.workloads.len(),
            containers = payload.container_count(),
            "built governor telemetry payload"
        );
        debug_pretty_json("governor telemetry payload", &payload);

        let provider = self.provider.as_ref().ok_or_else(|| {
            error!("no bearer token provider configured for telemetry export");
            ExportError::NoProvider
        })?;

        let token = provider.bearer_token(cancel).await.map_err(|e| {
            error!(error = %e, "failed to obtain governor access token");
            ExportError::Auth(e)
        })?;
        if token.is_empty() {
            return Err(ExportError::NoToken);
        }

        let response = self.sink.post(&payload, &token).await.map_err(|e| {
            error!(error = %e, "governor api request failed");
            ExportError::Transport(e)
        })?;

        if response.status != TELEMETRY_SUCCESS_STATUS {
            error!(status = %response.status, "governor api rejected telemetry");
            return Err(ExportError::UnexpectedStatus {
                class: StatusClass::classify(response.status, &response.headers),
                status: response.status,
                status_text: response.status_text,
            });
        }

        info!("telemetry delivered to governor api");
        Ok(())
    }
}

impl std::fmt::Debug for TelemetryExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryExporter")
            .field("has_provider", &self.provider.is_some())
            .finish_non_exhaustive()
    }
}
