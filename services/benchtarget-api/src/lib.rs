pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod telemetry;

pub use crate::config::{BenchTargetConfig, Cli};
pub use error::{ApiError, Result};
pub use rest::build_router;
pub use state::AppState;

use std::future::IntoFuture;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

/// Boots the benchmark target and serves until SIGINT/SIGTERM.
///
/// A malformed latency file or an unusable bind address fails here, before
/// any request is accepted.
pub async fn run_server(config: BenchTargetConfig) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let app = build_router(state);

    let addr = config.server.socket_addr()?;
    info!("Starting http-bench-target on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ApiError::Bind { addr, source })?;

    info!("Server successfully bound to {}", addr);

    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = signalled_tx.send(());
        })
        .into_future();
    tokio::pin!(server);

    let grace = config.server.shutdown_timeout();
    let drain_deadline = async move {
        if signalled_rx.await.is_ok() {
            tokio::time::sleep(grace).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = &mut server => result.map_err(ApiError::Server)?,
        _ = drain_deadline => {
            warn!(
                grace_secs = grace.as_secs(),
                "In-flight requests did not finish within the shutdown grace period"
            );
        }
    }

    info!("main: done. exiting");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received CTRL+C signal, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM signal, initiating graceful shutdown");
        }
    }
}
