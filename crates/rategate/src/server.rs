//! Axum-based HTTP server.
//!
//! [`GatewayServer`] wires the client registry, the idle reaper, the
//! admission middleware and the wrapped endpoint into a running axum service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `ANY`  | `/ping` | Rate-limited informational endpoint. |

use crate::config::GatewayConfig;
use crate::error::ServerError;
use crate::handlers::endpoint;
use crate::limiter::{ClientRegistry, IdleReaper};
use crate::middleware::admission;
use crate::state::AdmissionState;
use axum::{Router, middleware::from_fn_with_state, routing::any};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// High-level server owning the registry shared by the middleware and the
/// idle reaper.
pub struct GatewayServer {
    config: GatewayConfig,
    registry: Arc<ClientRegistry>,
}

impl GatewayServer {
    /// Create a new server, validating `config`.
    pub fn new(config: GatewayConfig) -> Result<Self, ServerError> {
        config.validate()?;
        let registry = Arc::new(ClientRegistry::from_config(&config.limiter));
        Ok(Self { config, registry })
    }

    /// The registry backing this server's admission decisions.
    pub fn registry(&self) -> Arc<ClientRegistry> {
        Arc::clone(&self.registry)
    }

    /// Build the axum [`Router`]: `/ping` behind the admission middleware.
    ///
    /// The router needs `ConnectInfo<SocketAddr>`; [`serve()`](Self::serve)
    /// provides it.
    pub fn build_app(&self) -> Router {
        let state = AdmissionState::new(self.registry(), self.config.mode);

        Router::new()
            .route("/ping", any(endpoint))
            .route_layer(from_fn_with_state(state, admission))
    }

    /// Bind to the configured address and serve until `shutdown` is
    /// cancelled.
    pub async fn start(self, shutdown: CancellationToken) -> Result<(), ServerError> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    ///
    /// Spawns the idle reaper, serves until `shutdown` is cancelled, drains
    /// in-flight requests, then stops the reaper.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), ServerError> {
        let local_addr = listener.local_addr().map_err(ServerError::Serve)?;
        info!(
            addr = %local_addr,
            capacity = self.config.limiter.capacity,
            refill_per_second = self.config.limiter.refill_per_second,
            mode = ?self.config.mode,
            "rategate listening"
        );

        let reaper_token = shutdown.child_token();
        let reaper = IdleReaper::from_config(self.registry(), &self.config.limiter)
            .spawn(reaper_token.clone());

        let app = self.build_app();
        let signal = shutdown.clone();
        let result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { signal.cancelled().await })
        .await;

        reaper_token.cancel();
        if let Err(err) = reaper.await {
            warn!(error = %err, "idle reaper task ended abnormally");
        }
        info!(clients = self.registry.len(), "rategate stopped");

        result.map_err(ServerError::Serve)
    }
}
