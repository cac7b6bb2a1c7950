use anyhow::{Context, Result};
use kmcp_cli::{build_operation_set_config, validate_cli, Cli};
use kmcp_core::RotationLimits;
use kmcp_gateway::McpGatewayServerConfig;
use kmcp_ops::verify_kubectl_available;

pub(crate) fn build_gateway_server_config(
    cli: &Cli,
    audit_rotation: RotationLimits,
) -> McpGatewayServerConfig {
    McpGatewayServerConfig {
        bind: cli.bind.clone(),
        operations: build_operation_set_config(cli),
        dispatch_audit_log: cli.dispatch_audit_log,
        audit_rotation,
    }
}

/// Validates flags, creates the workspace directories and checks kubectl.
/// Any failure here aborts startup before the listener is bound.
pub(crate) async fn execute_startup_preflight(cli: &Cli) -> Result<McpGatewayServerConfig> {
    validate_cli(cli)?;
    let config = build_gateway_server_config(cli, RotationLimits::from_env());

    config.operations.layout.initialize()?;

    let outcome = verify_kubectl_available(&config.operations.kubectl_program)
        .await
        .context("startup preflight failed")?;
    tracing::info!(
        kubectl = %config.operations.kubectl_program,
        version = %outcome.stdout.trim(),
        "kubectl available"
    );
    Ok(config)
}
