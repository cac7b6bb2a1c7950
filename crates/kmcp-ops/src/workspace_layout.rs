use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub const MANIFESTS_DIR_NAME: &str = "manifests";
pub const SCRIPTS_DIR_NAME: &str = "scripts";
pub const LOGS_DIR_NAME: &str = "logs";

/// The three directories the server reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    pub manifests_dir: PathBuf,
    pub scripts_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl WorkspaceLayout {
    /// Places `manifests/`, `scripts/` and `logs/` directly under `root`.
    pub fn from_root(root: &Path) -> Self {
        Self {
            manifests_dir: root.join(MANIFESTS_DIR_NAME),
            scripts_dir: root.join(SCRIPTS_DIR_NAME),
            logs_dir: root.join(LOGS_DIR_NAME),
        }
    }

    /// Creates every directory that does not exist yet.
    ///
    /// Must complete before the listener accepts requests; operations assume
    /// the directories are present and never create them on demand.
    pub fn initialize(&self) -> Result<()> {
        for (label, dir) in self.directories() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {label} directory {}", dir.display()))?;
            tracing::debug!(directory = %dir.display(), "{label} directory ready");
        }
        Ok(())
    }

    pub fn directories(&self) -> [(&'static str, &Path); 3] {
        [
            (MANIFESTS_DIR_NAME, self.manifests_dir.as_path()),
            (SCRIPTS_DIR_NAME, self.scripts_dir.as_path()),
            (LOGS_DIR_NAME, self.logs_dir.as_path()),
        ]
    }
}
