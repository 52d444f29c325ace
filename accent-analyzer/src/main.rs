//! accent-analyzer - English accent analysis service
//!
//! Fetches audio from a URL, normalizes it to 16 kHz mono PCM, classifies
//! the accent with a hosted model and caches results for an hour.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use accent_analyzer::config::{CacheBackend, Cli, Settings, MODULE_NAME};
use accent_analyzer::services::{CacheStore, MemoryCacheStore, RestCacheStore};
use accent_analyzer::AppState;

const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Settings are resolved before logging so `log_level` can seed the filter;
    // the resolution notes are replayed once the subscriber is installed
    let (settings, config_report) = Settings::load(&cli).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("accent_analyzer={0},accent_common={0},tower_http=info", settings.log_level)
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    config_report.log();

    info!(
        "Starting {} v{} [{}] built {} ({})",
        MODULE_NAME,
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!(
        model_id = %settings.model_id,
        rate_limit_per_minute = settings.rate_limit_per_minute.get(),
        dedupe_in_flight = settings.dedupe_in_flight,
        "Configuration resolved"
    );

    let (cache_store, memory_store): (Arc<dyn CacheStore>, Option<Arc<MemoryCacheStore>>) =
        match &settings.cache {
            CacheBackend::Rest { url, token } => {
                let store = RestCacheStore::new(url.as_str(), token.as_str())
                    .context("Failed to create cache client")?;
                match store.ping().await {
                    Ok(()) => info!("Shared cache reachable at {}", url),
                    Err(e) => warn!("Shared cache not reachable at startup: {}", e),
                }
                let shared: Arc<dyn CacheStore> = Arc::new(store);
                (shared, None)
            }
            CacheBackend::Memory => {
                warn!("No shared cache configured; using in-process cache");
                let store = Arc::new(MemoryCacheStore::new());
                let shared: Arc<dyn CacheStore> = store.clone();
                (shared, Some(store))
            }
        };

    let state = AppState::from_settings(&settings, cache_store)
        .context("Failed to initialize analysis pipeline")?;

    accent_analyzer::spawn_maintenance(memory_store, state.rate_limiter.clone(), MAINTENANCE_INTERVAL);

    let app = accent_analyzer::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", settings.bind_address))?;
    info!("Listening on http://{}", settings.bind_address);
    info!("Health check: http://{}/health", settings.bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
