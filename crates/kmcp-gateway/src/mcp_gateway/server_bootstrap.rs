//! MCP gateway server bootstrap.

use super::*;

/// Binds `config.bind` and serves until Ctrl-C.
///
/// The workspace directories must already exist; startup preflight creates them.
pub async fn run_mcp_gateway_server(config: McpGatewayServerConfig) -> Result<()> {
    let bind_addr = parse_bind_addr(&config.bind)?;

    let listener = bind_listener(bind_addr).await?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound mcp gateway address")?;
    let dispatcher = config.build_dispatcher();

    tracing::info!(
        addr = %local_addr,
        endpoint = MCP_ENDPOINT,
        manifests_dir = %config.operations.layout.manifests_dir.display(),
        scripts_dir = %config.operations.layout.scripts_dir.display(),
        path_policy = config.operations.path_policy.as_str(),
        max_concurrent_processes = config.operations.max_concurrent_processes,
        "mcp gateway server listening"
    );

    let app = build_mcp_gateway_router(dispatcher);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("mcp gateway server exited unexpectedly")?;

    tracing::info!("mcp gateway server stopped");
    Ok(())
}
