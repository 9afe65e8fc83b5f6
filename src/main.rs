//! Response Cache demo server
//!
//! Serves a small item API with the response cache in front of it.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use response_cache::cache::{BoundedMemoryStore, RedisBackend, RemoteStore, Store};
use response_cache::{create_router, AppState, BackendKind, Config};

/// Main entry point for the demo server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the configured store (memory or Redis)
/// 4. Create Axum router with the cache middleware
/// 5. Start HTTP server on configured port
/// 6. On SIGINT/SIGTERM, drain connections and close the store
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "response_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting response cache demo server");

    let config = Config::from_env().context("invalid configuration")?;
    info!(
        "Configuration loaded: backend={:?}, max_entries={}, default_ttl={}s, max_age={}s, port={}",
        config.backend, config.max_entries, config.default_ttl, config.max_age, config.server_port
    );

    let store = build_store(&config).await?;
    info!("Cache store initialized ({})", store.backend_name());

    let state = AppState::new(store.clone(), config.max_age)?;
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Err(e) = store.close().await {
        warn!("Failed to close cache store: {}", e);
    }
    info!("Server shutdown complete");
    Ok(())
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match config.backend {
        BackendKind::Memory => Arc::new(BoundedMemoryStore::new(config.memory_store_config())?),
        BackendKind::Redis => {
            let backend = RedisBackend::connect(&config.redis_url)
                .await
                .with_context(|| format!("failed to connect to {}", config.redis_url))?;
            Arc::new(RemoteStore::new(
                Arc::new(backend),
                config.remote_store_config(),
            )?)
        }
    };
    Ok(store)
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
