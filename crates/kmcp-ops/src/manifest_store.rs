use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::path_policy::{resolve_workspace_child_path, PathPolicy};

pub const DEFAULT_MANIFEST_FILENAME: &str = "manifest.yaml";
const LISTED_MANIFEST_SUFFIX: &str = ".yaml";

/// Result of `write_manifest`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ManifestWriteReport {
    pub path: String,
    pub size: u64,
    pub exists: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ManifestEntry {
    pub name: String,
    pub path: String,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct ManifestListing {
    pub manifests: Vec<ManifestEntry>,
    pub count: usize,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ManifestStoreError {
    #[error("Failed to write manifest: {0}")]
    Write(String),
    #[error("Failed to list manifests: {0}")]
    List(String),
}

/// Writes `content` to `<manifests_dir>/<filename>`, replacing any existing file.
///
/// Plain write, not temp-file + rename: concurrent writers to the same name race
/// and the last one wins.
pub async fn write_manifest(
    manifests_dir: &Path,
    filename: &str,
    content: &str,
    policy: PathPolicy,
) -> Result<ManifestWriteReport, ManifestStoreError> {
    let path = resolve_workspace_child_path(manifests_dir, filename, policy)
        .map_err(|error| ManifestStoreError::Write(error.to_string()))?;
    tokio::fs::write(&path, content)
        .await
        .map_err(|error| ManifestStoreError::Write(format!("{}: {error}", path.display())))?;
    let exists = tokio::fs::try_exists(&path).await.unwrap_or(false);
    tracing::debug!(path = %path.display(), bytes = content.len(), "manifest written");
    Ok(ManifestWriteReport {
        path: path.display().to_string(),
        size: content.len() as u64,
        exists,
    })
}

/// Lists `*.yaml` entries of `manifests_dir` in directory enumeration order.
pub async fn list_manifests(manifests_dir: &Path) -> Result<ManifestListing, ManifestStoreError> {
    let mut entries = tokio::fs::read_dir(manifests_dir).await.map_err(|error| {
        ManifestStoreError::List(format!("{}: {error}", manifests_dir.display()))
    })?;

    let mut manifests = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|error| {
        ManifestStoreError::List(format!("{}: {error}", manifests_dir.display()))
    })? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_listed_manifest_name(&name) {
            continue;
        }
        let path = entry.path();
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|error| ManifestStoreError::List(format!("{}: {error}", path.display())))?;
        manifests.push(ManifestEntry {
            name,
            path: path.display().to_string(),
            size: metadata.len(),
        });
    }

    let count = manifests.len();
    Ok(ManifestListing { manifests, count })
}

/// True for names matched by the `*.yaml` listing filter. Case-sensitive; `.yml` is not listed.
pub fn is_listed_manifest_name(name: &str) -> bool {
    name.ends_with(LISTED_MANIFEST_SUFFIX)
}
