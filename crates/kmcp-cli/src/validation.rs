use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use kmcp_ops::{OperationSetConfig, WorkspaceLayout};

use crate::Cli;

/// Rejects flag combinations the server cannot start with.
pub fn validate_cli(cli: &Cli) -> Result<()> {
    cli.bind
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid --bind '{}'", cli.bind))?;
    if cli.kubectl_bin.trim().is_empty() {
        bail!("--kubectl-bin cannot be empty");
    }
    if cli.bash_bin.trim().is_empty() {
        bail!("--bash-bin cannot be empty");
    }
    Ok(())
}

/// `--root-dir` layout with any per-directory overrides applied.
pub fn resolve_workspace_layout(cli: &Cli) -> WorkspaceLayout {
    let mut layout = WorkspaceLayout::from_root(&cli.root_dir);
    if let Some(dir) = &cli.manifests_dir {
        layout.manifests_dir = dir.clone();
    }
    if let Some(dir) = &cli.scripts_dir {
        layout.scripts_dir = dir.clone();
    }
    if let Some(dir) = &cli.logs_dir {
        layout.logs_dir = dir.clone();
    }
    layout
}

pub fn build_operation_set_config(cli: &Cli) -> OperationSetConfig {
    OperationSetConfig {
        layout: resolve_workspace_layout(cli),
        kubectl_program: cli.kubectl_bin.trim().to_string(),
        bash_program: cli.bash_bin.trim().to_string(),
        path_policy: cli.path_policy.into(),
        max_concurrent_processes: cli.max_concurrent_processes,
    }
}
