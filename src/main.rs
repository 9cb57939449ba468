use inspector_governor::auth::{
    BearerTokenProvider, CredentialProvider, HttpTokenIssuer, MountedSecretStore,
    RefreshSettings, SecretRef, SharedCredentialProvider, SystemClock,
};
use inspector_governor::config::{Config, DEFAULT_CONFIG_FILE};
use inspector_governor::report::AssessmentReport;
use inspector_governor::store::{RecordRef, SqliteRecordStore};
use inspector_governor::telemetry::{HttpTelemetrySink, TelemetryExporter};
use mimalloc::MiMalloc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load(Path::new(DEFAULT_CONFIG_FILE))?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        api_url = %cfg.governor.api_url,
        cluster_id = %cfg.governor.cluster_id,
        token_url = %cfg.auth.token_url,
        proxy = %cfg.governor.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        shared_store = cfg.auth.shared.enabled,
        loglevel = %cfg.basic.loglevel,
    );

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown(cancel.clone()));

    let report_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| cfg.basic.report_path.clone(), PathBuf::from);
    let report = AssessmentReport::from_file(&report_path).await.map_err(|e| {
        error!(path = %report_path.display(), error = %e, "failed to read assessment report");
        e
    })?;

    let provider = build_provider(&cfg, &cancel).await?;
    let sink = Arc::new(HttpTelemetrySink::from_config(&cfg.governor)?);
    let exporter = TelemetryExporter::new(sink).with_token_provider(provider);

    if let Err(e) = exporter.export(&cancel, &report).await {
        error!(error = %e, "telemetry export failed");
        return Err(e.into());
    }
    Ok(())
}

async fn build_provider(
    cfg: &Config,
    cancel: &CancellationToken,
) -> Result<Arc<dyn BearerTokenProvider>, Box<dyn std::error::Error>> {
    let secrets = MountedSecretStore::new(&cfg.auth.secret_root);
    let secret = SecretRef::new(
        &cfg.auth.secret_namespace,
        &cfg.auth.secret_name,
        &cfg.auth.secret_key,
    );
    let issuer = Arc::new(HttpTokenIssuer::from_config(&cfg.auth)?);
    let clock = Arc::new(SystemClock);
    let settings = RefreshSettings::from(&cfg.auth);

    if cfg.auth.shared.enabled {
        let store = Arc::new(SqliteRecordStore::connect(&cfg.auth.shared.database_url).await?);
        let location = RecordRef::new(&cfg.auth.shared.namespace, &cfg.auth.shared.record_name);
        let provider = SharedCredentialProvider::from_secret(
            &secrets, &secret, issuer, clock, settings, store, location, cancel,
        )
        .await?;
        let provider: Arc<dyn BearerTokenProvider> = Arc::new(provider);
        return Ok(provider);
    }

    let provider =
        CredentialProvider::from_secret(&secrets, &secret, issuer, clock, settings, cancel)
            .await?;
    let provider: Arc<dyn BearerTokenProvider> = Arc::new(provider);
    Ok(provider)
}

async fn cancel_on_shutdown(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown requested; cancelling pending retries");
    cancel.cancel();
}
