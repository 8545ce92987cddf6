//! The daemon process and its control plane
//!
//! The daemon owns the single bridge connection to the tool server and exposes it
//! over loopback HTTP. A failed connection does not stop the daemon: it still binds
//! so `/status` can report `lastError` and the session can be inspected and stopped.

mod client;
pub mod protocol;
pub mod server;
mod state;

use std::future::Future;
use std::net::Ipv4Addr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use crate::bridge::{ProtocolBridge, RmcpBridge, TransportSpec};

pub use client::{ClientError, DaemonClient, STATUS_TIMEOUT};
pub use protocol::{CallRequest, ErrorKind, ErrorResponse, StatusResponse, ToolsResponse};
pub use state::{ConnectionState, DaemonState};

/// What the supervisor hands to a daemon process
#[derive(Debug, Clone)]
pub struct DaemonOptions {
    pub session: String,
    pub port: u16,
    pub server_name: String,
    pub transport: TransportSpec,
}

/// Run the daemon until SIGTERM or Ctrl+C
pub async fn run(options: DaemonOptions) -> Result<()> {
    run_until(options, shutdown_signal()).await
}

/// Run the daemon until `shutdown` resolves
pub async fn run_until(
    options: DaemonOptions,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    tracing::info!(
        "Daemon for session '{}' starting (pid {}, server '{}')",
        options.session,
        std::process::id(),
        options.server_name
    );

    let (connection, bridge) = match RmcpBridge::connect(&options.transport).await {
        Ok(bridge) => {
            tracing::info!("Connected to MCP server '{}'", options.server_name);
            let bridge: Arc<dyn ProtocolBridge> = Arc::new(bridge);
            (ConnectionState::connected(&options.server_name), Some(bridge))
        }
        Err(e) => {
            tracing::error!(
                "Could not connect to MCP server '{}': {:#}",
                options.server_name,
                e
            );
            (
                ConnectionState::failed(&options.server_name, format!("{:#}", e)),
                None,
            )
        }
    };

    let state = DaemonState::new(&options.session, connection, bridge);

    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, options.port))
        .await
        .with_context(|| format!("Failed to bind 127.0.0.1:{}", options.port))?;
    tracing::info!("Control plane listening on http://127.0.0.1:{}", options.port);

    server::serve(listener, state, shutdown).await?;

    tracing::info!("Daemon for session '{}' stopped", options.session);
    Ok(())
}

/// Resolves on SIGTERM (what `stop` sends) or Ctrl+C
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Interrupted"),
        _ = terminate => tracing::info!("Termination requested"),
    }
}
