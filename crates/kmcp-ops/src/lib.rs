//! Filesystem and subprocess operations behind the kube-mcp dispatcher.
//!
//! Hosts the workspace directory layout, the caller-path policy, the manifest
//! store, and the captured-subprocess runtime used by the kubectl and bash
//! script operations.

pub mod kubectl_runtime;
pub mod manifest_store;
pub mod operation_set;
pub mod path_policy;
pub mod process_runtime;
pub mod script_runtime;
pub mod workspace_layout;

pub use kubectl_runtime::*;
pub use manifest_store::*;
pub use operation_set::*;
pub use path_policy::*;
pub use process_runtime::*;
pub use script_runtime::*;
pub use workspace_layout::*;

#[cfg(test)]
pub(crate) mod test_support;
