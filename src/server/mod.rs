// osintgate - HTTP Server Module
// Authenticated HTTP surface over the tool dispatcher

mod handlers;
mod middleware;
mod upload;

pub use handlers::{create_router, health_check, HealthStatus};
pub use middleware::require_api_key;
pub use upload::{content_addressed_name, UploadResponse};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::cache::connect_cache;
use crate::config::GatewayConfig;
use crate::tools::{Dispatcher, SubprocessRunner, ToolRegistry};

/// Gateway context shared by every request
///
/// Built once at startup; dropping it (after `serve` returns) tears down the
/// cache connection. Cancelling the shutdown token kills in-flight tools.
pub struct GatewayServer {
    config: GatewayConfig,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
    started_at: DateTime<Utc>,
}

impl GatewayServer {
    /// Assemble a server from already-built parts
    pub fn new(config: GatewayConfig, dispatcher: Dispatcher, shutdown: CancellationToken) -> Self {
        Self {
            config,
            dispatcher,
            shutdown,
            started_at: Utc::now(),
        }
    }

    /// Wire the production stack: directories, cache, registry, runner
    pub async fn from_config(config: GatewayConfig) -> Result<Self> {
        for dir in [&config.uploads_dir, &config.results_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }

        let shutdown = CancellationToken::new();
        let cache = connect_cache(&config).await;
        let registry = Arc::new(ToolRegistry::from_config(&config));
        let runner = Arc::new(SubprocessRunner::new(shutdown.clone()));
        let dispatcher = Dispatcher::new(registry, cache, runner);

        Ok(Self::new(config, dispatcher, shutdown))
    }

    /// Start the HTTP server and run until ctrl-c / SIGTERM
    pub async fn serve(self) -> Result<()> {
        let addr: SocketAddr = self
            .config
            .bind_address()
            .parse()
            .with_context(|| format!("Invalid bind address {}", self.config.bind_address()))?;
        let shutdown = self.shutdown.clone();

        let app = create_router(Arc::new(self))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http());

        tracing::info!("Starting OSINT API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Token cancelled when the gateway shuts down
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

/// Resolve on ctrl-c or SIGTERM, cancelling in-flight tool runs
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = token.cancelled() => {},
    }

    tracing::info!("Shutdown requested, terminating in-flight tool runs");
    token.cancel();
}
