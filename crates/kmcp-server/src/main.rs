mod bootstrap_helpers;
mod startup_preflight;

use anyhow::Result;
use clap::Parser;
use kmcp_cli::Cli;
use kmcp_gateway::run_mcp_gateway_server;

use crate::bootstrap_helpers::init_tracing;
use crate::startup_preflight::execute_startup_preflight;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = execute_startup_preflight(&cli).await?;
    run_mcp_gateway_server(config).await
}
