use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use kmcp_core::RotationLimits;
use kmcp_ops::{OperationSet, OperationSetConfig};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::dispatch_audit::DispatchAuditLogger;
use crate::mcp_dispatch::{McpDispatcher, McpRequest, McpResponse, SUPPORTED_METHODS};

mod server_bootstrap;

pub use server_bootstrap::run_mcp_gateway_server;

pub const MCP_ENDPOINT: &str = "/mcp";
pub const HEALTH_ENDPOINT: &str = "/health";
pub const INFO_ENDPOINT: &str = "/";
const SERVER_NAME: &str = "Kubernetes MCP Server";
const SERVER_DESCRIPTION: &str = "MCP server for kubectl operations and bash script execution";

#[derive(Debug, Clone)]
/// Public struct `McpGatewayServerConfig` for `run_mcp_gateway_server`.
pub struct McpGatewayServerConfig {
    pub bind: String,
    pub operations: OperationSetConfig,
    pub dispatch_audit_log: bool,
    pub audit_rotation: RotationLimits,
}

impl McpGatewayServerConfig {
    /// Builds the dispatcher, attaching the audit logger when enabled.
    pub fn build_dispatcher(&self) -> McpDispatcher {
        let dispatcher = McpDispatcher::new(OperationSet::new(self.operations.clone()));
        if !self.dispatch_audit_log {
            return dispatcher;
        }
        dispatcher.with_audit_logger(DispatchAuditLogger::new(
            &self.operations.layout.logs_dir,
            self.audit_rotation,
        ))
    }
}

#[derive(Clone)]
struct McpGatewayServerState {
    dispatcher: McpDispatcher,
}

/// Router serving `/mcp`, `/health` and `/`.
pub fn build_mcp_gateway_router(dispatcher: McpDispatcher) -> Router {
    let state = Arc::new(McpGatewayServerState { dispatcher });
    Router::new()
        .route(MCP_ENDPOINT, post(handle_mcp_request))
        .route(HEALTH_ENDPOINT, get(handle_health))
        .route(INFO_ENDPOINT, get(handle_info))
        .with_state(state)
}

async fn handle_mcp_request(
    State(state): State<Arc<McpGatewayServerState>>,
    body: Bytes,
) -> Response {
    let request = match serde_json::from_slice::<McpRequest>(&body) {
        Ok(request) => request,
        Err(error) => {
            tracing::debug!(%error, "rejected malformed mcp request body");
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(McpResponse::failure(format!("invalid request body: {error}"))),
            )
                .into_response();
        }
    };
    Json(state.dispatcher.dispatch(&request).await).into_response()
}

async fn handle_health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "kubectl_available": true,
    }))
}

async fn handle_info() -> Json<Value> {
    Json(info_payload())
}

fn info_payload() -> Value {
    json!({
        "name": SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "description": SERVER_DESCRIPTION,
        "endpoints": {
            "mcp": MCP_ENDPOINT,
            "health": HEALTH_ENDPOINT,
        },
        "supported_methods": SUPPORTED_METHODS,
    })
}

fn parse_bind_addr(bind: &str) -> Result<SocketAddr> {
    bind.parse::<SocketAddr>()
        .with_context(|| format!("invalid --bind '{bind}'"))
}

async fn bind_listener(bind_addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind mcp gateway server on {bind_addr}"))
}
