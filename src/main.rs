use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;
use clinicdesk::api::RestApi;
use clinicdesk::config::load_config;
use clinicdesk::schedule::{Clock, QueryEngine, SystemClock};
use clinicdesk::storage::{AppointmentStore, JsonFileSource, RecordSource};
use clinicdesk::{ClinicError, ClinicResult};

#[tokio::main]
async fn main() -> ClinicResult<()> {
    let config_path = std::env::var_os("CLINICDESK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let config = load_config(&config_path)?;

    // RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if !config_path.exists() {
        tracing::warn!(path = %config_path.display(), "no config file, running with defaults");
    }
    tracing::info!(source = %config.source.path.display(), "starting clinicdesk");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let source: Arc<dyn RecordSource> = Arc::new(JsonFileSource::new(&config.source.path)?);
    let store = Arc::new(AppointmentStore::new(Arc::clone(&clock)));
    let engine = Arc::new(QueryEngine::new(store, source, clock));

    // An unreadable source leaves the store empty until the next reload.
    match engine.reload().await {
        Ok(count) => tracing::info!(count, "appointments loaded"),
        Err(e) => tracing::error!(error = %e, "initial load failed"),
    }

    let api = RestApi::new(Arc::clone(&engine));
    let addr = config.socket_addr()?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let (bound, server) = warp::serve(api.routes())
        .try_bind_with_graceful_shutdown(addr, async move {
            shutdown_rx.await.ok();
            tracing::info!("shutting down server");
        })
        .map_err(|e| ClinicError::Server(e.to_string()))?;

    tracing::info!(%bound, "listening");
    let server_handle = tokio::spawn(server);

    signal::ctrl_c().await?;
    tracing::info!("ctrl-c received, starting graceful shutdown");
    shutdown_tx.send(()).ok();

    server_handle
        .await
        .map_err(|e| ClinicError::Server(e.to_string()))?;

    tracing::info!("server shutdown complete");
    Ok(())
}
