use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::path_policy::{resolve_workspace_child_path, PathPolicy, PathPolicyError};
use crate::process_runtime::{
    run_captured_process, ProcessContextField, ProcessLimiter, ProcessOutcome,
};

pub const DEFAULT_BASH_PROGRAM: &str = "bash";
pub const DEFAULT_SCRIPT_NAME: &str = "temp_script";
pub const SCRIPT_FILE_MODE: u32 = 0o755;
const SCRIPT_FILE_SUFFIX: &str = ".sh";

/// Why a script could not be placed on disk before execution.
#[derive(Debug, Error)]
pub enum ScriptPersistError {
    #[error(transparent)]
    Path(#[from] PathPolicyError),
    #[error("failed to write script {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to chmod script {path}: {source}")]
    Chmod {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Persists `content` as `<scripts_dir>/<name>.sh` and runs it with `interpreter`.
///
/// The script file is left in place after the run. A failure to persist the
/// script is reported like a spawn failure.
pub async fn execute_bash_script(
    scripts_dir: &Path,
    name: &str,
    content: &str,
    interpreter: &str,
    policy: PathPolicy,
    limiter: &ProcessLimiter,
) -> ProcessOutcome {
    let script_path = match persist_script(scripts_dir, name, content, policy).await {
        Ok(path) => path,
        Err(error) => {
            tracing::warn!(script = name, %error, "failed to persist script");
            return ProcessOutcome::spawn_failure(
                ProcessContextField::ScriptPath,
                error.to_string(),
            );
        }
    };

    let script_path = script_path.display().to_string();
    tracing::debug!(script_path = %script_path, interpreter, "running script");
    run_captured_process(
        interpreter,
        std::slice::from_ref(&script_path),
        ProcessContextField::ScriptPath,
        script_path.clone(),
        limiter,
    )
    .await
}

/// `<name>.sh`; the name itself is not altered.
pub fn script_file_name(name: &str) -> String {
    format!("{name}{SCRIPT_FILE_SUFFIX}")
}

async fn persist_script(
    scripts_dir: &Path,
    name: &str,
    content: &str,
    policy: PathPolicy,
) -> Result<PathBuf, ScriptPersistError> {
    let path = resolve_workspace_child_path(scripts_dir, &script_file_name(name), policy)?;
    tokio::fs::write(&path, content)
        .await
        .map_err(|source| ScriptPersistError::Write {
            path: path.display().to_string(),
            source,
        })?;
    mark_executable(&path).await?;
    Ok(path)
}

#[cfg(unix)]
async fn mark_executable(path: &Path) -> Result<(), ScriptPersistError> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(SCRIPT_FILE_MODE))
        .await
        .map_err(|source| ScriptPersistError::Chmod {
            path: path.display().to_string(),
            source,
        })
}

#[cfg(not(unix))]
async fn mark_executable(_path: &Path) -> Result<(), ScriptPersistError> {
    Ok(())
}
