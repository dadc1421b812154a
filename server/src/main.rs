use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};
use planportal::config::{LogFormat, LoggingConfig};
use planportal::{
    load_from_environment, router, AppState, DisabledLookup, PlanningPortalClient, Portal,
    PortalConfig, PropertyLookup,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            Err(e) => {
                warn!("Failed to register SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Installs the subscriber and routes `log` records into it.
fn init_tracing(logging: &LoggingConfig) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match logging.format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json()),
        ),
        LogFormat::Text => tracing::subscriber::set_global_default(
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer()),
        ),
    };
    result.map_err(|e| format!("failed to install subscriber: {e}"))?;
    tracing_log::LogTracer::init().map_err(|e| format!("failed to bridge log records: {e}"))
}

fn property_lookup(config: &PortalConfig) -> Arc<dyn PropertyLookup> {
    if !config.property_api.enabled {
        info!("Property lookup disabled by configuration");
        return Arc::new(DisabledLookup);
    }
    match PlanningPortalClient::new(&config.property_api) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            warn!("Property lookup unavailable: {}", e);
            Arc::new(DisabledLookup)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let config = load_from_environment().map_err(|e| format!("config error: {e}"))?;
    init_tracing(&config.logging)?;

    let data_dir = PathBuf::from(&config.data_directory);
    let portal = Portal::open(&data_dir).map_err(|e| format!("failed to open portal: {e}"))?;
    info!("Data directory: {}", data_dir.display());

    let state = AppState::new(portal, property_lookup(&config), config.max_upload_bytes);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", config.bind_address))?;
    info!("planportal listening on {}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .map_err(|e| format!("server failed: {e}"))?;

    info!("planportal stopped");
    Ok(())
}
