//! HTTP Server
//!
//! Axum server with CORS, request tracing, a per-request deadline and
//! graceful shutdown.

use crate::api::{api_router, envelope_timeout, AppState};
use crate::config::Config;
use axum::{
    http::{header, Method},
    middleware, Router,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Assistant HTTP server
pub struct AssistantServer {
    addr: SocketAddr,
    request_timeout: Duration,
    state: AppState,
}

impl AssistantServer {
    pub fn new(config: &Config, state: AppState) -> Self {
        Self {
            addr: config.socket_addr(),
            request_timeout: config.request_timeout,
            state,
        }
    }

    /// Build the router with all routes and middleware.
    ///
    /// A request past the deadline gets an enveloped 408 and its handler
    /// future is dropped, which cancels every provider call still in flight.
    pub fn build_router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]);

        api_router(self.state.clone())
            .layer(TimeoutLayer::new(self.request_timeout))
            .layer(middleware::map_response(envelope_timeout))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Start the server and run until a shutdown signal
    pub async fn run(self) -> anyhow::Result<()> {
        let router = self.build_router();

        info!("Starting assistant server on {}", self.addr);
        if self.state.info.demo_mode {
            info!("Demo mode - visit http://{}/demo for more info", self.addr);
        }

        let listener = tokio::net::TcpListener::bind(self.addr).await?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Assistant server shut down gracefully");
        Ok(())
    }
}

/// Graceful shutdown signal handler
pub async fn shutdown_signal() {
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
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
