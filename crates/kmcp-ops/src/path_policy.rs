use std::path::{Path, PathBuf};

use thiserror::Error;

/// How a caller-supplied name is turned into a path under a workspace directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathPolicy {
    /// Plain join: separators, `..` and absolute names are honored, so the
    /// result may land outside the directory.
    #[default]
    Permissive,
    /// Only a single plain file name is accepted.
    Confined,
}

impl PathPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Permissive => "permissive",
            Self::Confined => "confined",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathPolicyError {
    #[error("file name must be non-empty")]
    EmptyName,
    #[error("file name '{name}' must be a single path segment inside {root}")]
    EscapesRoot { name: String, root: String },
}

/// Resolves `name` against `root` under `policy`.
///
/// Every path built from request parameters goes through here.
pub fn resolve_workspace_child_path(
    root: &Path,
    name: &str,
    policy: PathPolicy,
) -> Result<PathBuf, PathPolicyError> {
    match policy {
        PathPolicy::Permissive => Ok(root.join(name)),
        PathPolicy::Confined => {
            if name.is_empty() {
                return Err(PathPolicyError::EmptyName);
            }
            if !is_single_plain_segment(name) {
                return Err(PathPolicyError::EscapesRoot {
                    name: name.to_string(),
                    root: root.display().to_string(),
                });
            }
            Ok(root.join(name))
        }
    }
}

fn is_single_plain_segment(name: &str) -> bool {
    if name.contains(&['/', '\\', '\0'][..]) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    )
}
