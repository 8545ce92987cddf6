//! Control-plane HTTP server
//!
//! Three endpoints on 127.0.0.1:
//! - `GET /status` always answers, connected or not
//! - `GET /tools` lists the server's capabilities
//! - `POST /call` invokes one capability
//!
//! Each request runs as its own task, so `/status` stays responsive while a
//! long `/call` is outstanding.

use std::future::Future;

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::protocol::{CallRequest, ErrorKind, ErrorResponse, StatusResponse, ToolsResponse};
use super::state::DaemonState;
use crate::bridge::ProtocolBridge;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Create the router with all routes
pub fn router(state: DaemonState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/tools", get(list_tools))
        .route("/call", post(call_tool))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    state: DaemonState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

fn connected_bridge(state: &DaemonState) -> Result<&dyn ProtocolBridge, ApiError> {
    state.bridge().map(|b| b.as_ref()).ok_or_else(|| {
        let reason = state
            .connection
            .last_error
            .as_deref()
            .unwrap_or("not connected");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new(
                ErrorKind::Unavailable,
                format!(
                    "MCP server '{}' is not connected: {}",
                    state.connection.server_name, reason
                ),
            )),
        )
    })
}

fn bridge_failure(err: anyhow::Error) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(ErrorKind::Bridge, format!("{:#}", err))),
    )
}

async fn status(State(state): State<DaemonState>) -> Json<StatusResponse> {
    Json(state.status())
}

async fn list_tools(State(state): State<DaemonState>) -> Result<Json<ToolsResponse>, ApiError> {
    let bridge = connected_bridge(&state)?;
    match bridge.list_capabilities().await {
        Ok(tools) => Ok(Json(ToolsResponse { tools })),
        Err(e) => {
            tracing::error!("Failed to list tools: {:#}", e);
            Err(bridge_failure(e))
        }
    }
}

async fn call_tool(
    State(state): State<DaemonState>,
    Json(req): Json<CallRequest>,
) -> Result<Json<Value>, ApiError> {
    let bridge = connected_bridge(&state)?;
    tracing::info!("Calling tool '{}'", req.tool);
    match bridge.invoke(&req.tool, req.arguments).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            tracing::error!("Tool '{}' failed: {:#}", req.tool, e);
            Err(bridge_failure(e))
        }
    }
}
