//! HTTP server module
//!
//! Serves the registry snapshot over an Axum router. Every pull of the
//! metrics path runs one scrape cycle.

pub mod handlers;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::collector::EurekaCollector;
use crate::config::Config;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Registry collector
    pub collector: Arc<EurekaCollector>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let collector = EurekaCollector::new(config.eureka.clone());
        Self {
            config: Arc::new(config),
            collector: Arc::new(collector),
        }
    }
}

/// Build the router with `/`, `/health` and the configured metrics path
pub fn router(state: AppState) -> Router {
    let metrics_path = state.config.server.path.clone();

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(&metrics_path, get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Parse a bind address, accepting `localhost` as 127.0.0.1
pub fn parse_bind_address(bind_address: &str) -> Result<IpAddr> {
    if bind_address == "localhost" {
        return Ok(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
    bind_address.parse().map_err(|e| {
        anyhow::anyhow!(
            "Invalid bind_address '{}': {}. Use an IP address (e.g., '0.0.0.0', '127.0.0.1') or 'localhost'.",
            bind_address,
            e
        )
    })
}

/// Run the HTTP server
///
/// # Arguments
/// * `config` - Application configuration; `config.server.port` is the listen port
///
/// # Errors
/// Returns an error if the address is invalid or the listener cannot bind
pub async fn run(config: Config) -> Result<()> {
    let addr = SocketAddr::from((
        parse_bind_address(&config.server.bind_address)?,
        config.server.port,
    ));
    let metrics_path = config.server.path.clone();

    info!(
        enabled = config.eureka.enabled,
        members = config.eureka.cluster.len(),
        cluster = %config.eureka.cluster_name,
        "Registry scrape configured"
    );

    let app = router(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, metrics_path = %metrics_path, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
