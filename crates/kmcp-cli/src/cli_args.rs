use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::CliPathPolicy;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "kube-mcp",
    about = "HTTP endpoint for kubectl commands, bash scripts and YAML manifests",
    version
)]
pub struct Cli {
    #[arg(
        long,
        env = "KMCP_BIND",
        default_value = "0.0.0.0:8000",
        help = "Socket address the HTTP server binds (host:port)"
    )]
    pub bind: String,

    #[arg(
        long,
        env = "KMCP_ROOT_DIR",
        default_value = "/app",
        help = "Directory holding manifests/, scripts/ and logs/"
    )]
    pub root_dir: PathBuf,

    #[arg(
        long,
        env = "KMCP_MANIFESTS_DIR",
        help = "Override for the manifests directory (default: <root-dir>/manifests)"
    )]
    pub manifests_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "KMCP_SCRIPTS_DIR",
        help = "Override for the scripts directory (default: <root-dir>/scripts)"
    )]
    pub scripts_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "KMCP_LOGS_DIR",
        help = "Override for the logs directory (default: <root-dir>/logs)"
    )]
    pub logs_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "KMCP_KUBECTL_BIN",
        default_value = "kubectl",
        help = "kubectl executable used for execute_kubectl and the startup check"
    )]
    pub kubectl_bin: String,

    #[arg(
        long,
        env = "KMCP_BASH_BIN",
        default_value = "bash",
        help = "Interpreter used for execute_bash_script"
    )]
    pub bash_bin: String,

    #[arg(
        long,
        env = "KMCP_PATH_POLICY",
        value_enum,
        default_value_t = CliPathPolicy::Permissive,
        help = "How caller-supplied file names map to paths: permissive joins them as-is (traversal allowed), confined accepts single file names only"
    )]
    pub path_policy: CliPathPolicy,

    #[arg(
        long,
        env = "KMCP_MAX_CONCURRENT_PROCESSES",
        default_value_t = 0,
        help = "Cap on simultaneously running subprocesses; 0 means unbounded"
    )]
    pub max_concurrent_processes: usize,

    #[arg(
        long,
        env = "KMCP_DISPATCH_AUDIT_LOG",
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Append one NDJSON record per request to <logs-dir>/dispatch-audit.jsonl"
    )]
    pub dispatch_audit_log: bool,
}
