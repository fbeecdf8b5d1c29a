//! Test server harness for E2E testing.
//!
//! Provides `TestRvServer` for spawning the real router on a random port.

use crate::fixtures::fast_settings;
use metrics_exporter_prometheus::PrometheusBuilder;
use rendezvous_service::config::Config;
use rendezvous_service::observability::HealthState;
use rendezvous_service::routes::{self, AppState};
use rendezvous_service::services::{LiveRelay, NoopRelay, RendezvousService, SecureIdGenerator};
use rendezvous_service::store::{InMemoryRoomStore, RoomStore};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Test harness for spawning the rendezvous service in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_join_e2e() -> Result<(), anyhow::Error> {
///     let server = TestRvServer::spawn().await?;
///     let client = reqwest::Client::new();
///
///     let response = client
///         .post(format!("{}/join/abc", server.url()))
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestRvServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    _handle: JoinHandle<()>,
}

impl TestRvServer {
    /// Spawn with an in-memory store, no live relay and default config.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(
            HashMap::new(),
            Arc::new(InMemoryRoomStore::new()),
            Arc::new(NoopRelay),
        )
        .await
    }

    /// Spawn with config overrides and explicit collaborators.
    ///
    /// `vars` are environment-style settings (`RV_MAX_MESSAGE_BYTES`, ...).
    pub async fn spawn_with(
        vars: HashMap<String, String>,
        store: Arc<dyn RoomStore>,
        relay: Arc<dyn LiveRelay>,
    ) -> Result<Self, anyhow::Error> {
        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let mut settings = fast_settings();
        settings.limits.max_buffered_messages = config.max_buffered_messages;
        settings.retry.max_attempts = config.cas_max_attempts;
        settings.client_id_length = config.client_id_length;

        let service = Arc::new(RendezvousService::new(
            store,
            Arc::new(SecureIdGenerator::new()),
            relay,
            settings,
        ));

        let health = Arc::new(HealthState::new());
        health.set_ready();

        let state = Arc::new(AppState {
            service,
            health,
            config,
        });

        // Build a recorder without installing it globally; tests in the same
        // process would otherwise fight over the global slot.
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();
        let app = routes::build_routes(Arc::clone(&state), metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The service behind the router, for arranging state directly.
    pub fn service(&self) -> &RendezvousService {
        &self.state.service
    }

    /// Health flags, e.g. to simulate shutdown.
    pub fn health(&self) -> &HealthState {
        &self.state.health
    }
}

impl Drop for TestRvServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_spawns_successfully() -> Result<(), anyhow::Error> {
        let server = TestRvServer::spawn().await?;
        assert!(server.url().starts_with("http://127.0.0.1:"));

        let response = reqwest::get(format!("{}/health", server.url())).await?;
        assert_eq!(response.status(), 200);

        Ok(())
    }

    #[tokio::test]
    async fn test_server_is_ready() -> Result<(), anyhow::Error> {
        let server = TestRvServer::spawn().await?;

        let response = reqwest::get(format!("{}/ready", server.url())).await?;
        assert_eq!(response.status(), 200);
        let body: serde_json::Value = response.json().await?;
        assert_eq!(body["status"], "ready");
        assert_eq!(body["store"], "healthy");

        Ok(())
    }

    #[tokio::test]
    async fn test_server_provides_addr() -> Result<(), anyhow::Error> {
        let server = TestRvServer::spawn().await?;
        let addr = server.addr();

        assert!(addr.ip().is_loopback());
        assert!(addr.port() > 0);
        assert_eq!(server.url(), format!("http://{addr}"));

        Ok(())
    }
}
