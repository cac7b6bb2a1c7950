use crate::kubectl_runtime::{execute_kubectl_command, DEFAULT_KUBECTL_PROGRAM};
use crate::manifest_store::{
    list_manifests, write_manifest, ManifestListing, ManifestStoreError, ManifestWriteReport,
};
use crate::path_policy::PathPolicy;
use crate::process_runtime::{ProcessLimiter, ProcessOutcome};
use crate::script_runtime::{execute_bash_script, DEFAULT_BASH_PROGRAM};
use crate::workspace_layout::WorkspaceLayout;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `OperationSetConfig` describing where and how operations run.
pub struct OperationSetConfig {
    pub layout: WorkspaceLayout,
    pub kubectl_program: String,
    pub bash_program: String,
    pub path_policy: PathPolicy,
    /// `0` leaves subprocess fan-out unbounded.
    pub max_concurrent_processes: usize,
}

impl OperationSetConfig {
    pub fn new(layout: WorkspaceLayout) -> Self {
        Self {
            layout,
            kubectl_program: DEFAULT_KUBECTL_PROGRAM.to_string(),
            bash_program: DEFAULT_BASH_PROGRAM.to_string(),
            path_policy: PathPolicy::default(),
            max_concurrent_processes: 0,
        }
    }
}

/// The four dispatchable operations bound to one workspace.
#[derive(Debug, Clone)]
pub struct OperationSet {
    config: OperationSetConfig,
    limiter: ProcessLimiter,
}

impl OperationSet {
    pub fn new(config: OperationSetConfig) -> Self {
        let limiter = ProcessLimiter::new(config.max_concurrent_processes);
        Self { config, limiter }
    }

    pub async fn write_yaml_manifest(
        &self,
        yaml: &str,
        filename: &str,
    ) -> Result<ManifestWriteReport, ManifestStoreError> {
        write_manifest(
            &self.config.layout.manifests_dir,
            filename,
            yaml,
            self.config.path_policy,
        )
        .await
    }

    pub async fn list_manifests(&self) -> Result<ManifestListing, ManifestStoreError> {
        list_manifests(&self.config.layout.manifests_dir).await
    }

    pub async fn execute_kubectl(&self, command: &[String]) -> ProcessOutcome {
        execute_kubectl_command(&self.config.kubectl_program, command, &self.limiter).await
    }

    pub async fn execute_bash_script(&self, script: &str, name: &str) -> ProcessOutcome {
        execute_bash_script(
            &self.config.layout.scripts_dir,
            name,
            script,
            &self.config.bash_program,
            self.config.path_policy,
            &self.limiter,
        )
        .await
    }
}
