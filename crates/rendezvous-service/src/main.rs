//! Rendezvous Service
//!
//! HTTP server pairing two participants per room for signaling exchange.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize tracing (JSON when `RV_LOG_JSON=true`)
//! 3. Install the Prometheus metrics recorder
//! 4. Open the room store (in-memory or Redis)
//! 5. Build the rendezvous service and HTTP routes
//! 6. Serve until Ctrl+C / SIGTERM, then drain gracefully

#![warn(clippy::pedantic)]

use anyhow::Context;
use common::secret::ExposeSecret;
use rendezvous_service::config::{Config, StoreBackend};
use rendezvous_service::observability::{init_metrics_recorder, HealthState};
use rendezvous_service::routes::{self, AppState};
use rendezvous_service::services::{
    ChannelRelay, RendezvousService, SecureIdGenerator, ServiceSettings,
};
use rendezvous_service::store::{InMemoryRoomStore, RedisRoomStore, RoomStore};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first so the log format can follow it; a load
    // error is reported once tracing is up.
    let config = Config::from_env();
    let log_json = config.as_ref().is_ok_and(|c| c.log_json);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rendezvous_service=debug,tower_http=debug".into());
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    info!("Starting Rendezvous Service");

    let config = config.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        instance_id = %config.instance_id,
        bind_address = %config.bind_address,
        store_backend = ?config.store_backend,
        client_id_length = config.client_id_length,
        cas_max_attempts = config.cas_max_attempts,
        max_buffered_messages = config.max_buffered_messages,
        "Configuration loaded successfully"
    );

    // Must happen before any metric is recorded.
    let metrics_handle = init_metrics_recorder()
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to initialize metrics")?;

    let store = open_store(&config).await?;
    info!(backend = store.backend(), "Room store ready");

    let service = Arc::new(RendezvousService::new(
        store,
        Arc::new(SecureIdGenerator::new()),
        Arc::new(ChannelRelay::default()),
        ServiceSettings::from_config(&config),
    ));

    let health = Arc::new(HealthState::new());
    let state = Arc::new(AppState {
        service,
        health: Arc::clone(&health),
        config: config.clone(),
    });
    let app = routes::build_routes(state, metrics_handle);

    // Bind before marking ready to fail fast on bind errors.
    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    let addr = listener.local_addr()?;
    health.set_ready();
    info!(addr = %addr, "Rendezvous Service listening");

    let shutdown_token = CancellationToken::new();
    let server_token = shutdown_token.child_token();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_token.cancelled().await })
            .await
    });

    shutdown_signal().await;
    info!("Shutdown signal received, initiating graceful shutdown...");

    // Stop advertising readiness before draining connections.
    health.set_not_ready();
    shutdown_token.cancel();

    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "HTTP server failed"),
        Err(e) => error!(error = %e, "HTTP server task panicked"),
    }

    info!("Rendezvous Service shutdown complete");
    Ok(())
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn RoomStore>> {
    let store: Arc<dyn RoomStore> = match config.store_backend {
        StoreBackend::Memory => Arc::new(InMemoryRoomStore::new()),
        StoreBackend::Redis => {
            let url = config
                .redis_url
                .as_ref()
                .context("REDIS_URL is required for the redis backend")?;
            info!("Connecting to Redis...");
            let store = RedisRoomStore::connect(url.expose_secret(), config.room_ttl_seconds)
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to connect to Redis");
                    e
                })?;
            Arc::new(store)
        }
    };
    Ok(store)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
