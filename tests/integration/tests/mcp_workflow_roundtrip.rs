use std::{net::SocketAddr, path::Path, time::Duration};

use kmcp_core::RotationLimits;
use kmcp_gateway::{build_mcp_gateway_router, McpGatewayServerConfig, DISPATCH_AUDIT_LOG_FILE};
use kmcp_ops::{OperationSetConfig, PathPolicy, WorkspaceLayout};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

const FAKE_KUBECTL_SCRIPT: &str = r#"#!/bin/sh
case "$1" in
  version)
    echo "Client Version: v1.30.0"
    ;;
  apply)
    echo "deployment.apps/$(basename "$3" .yaml) created"
    ;;
  get)
    echo "NAME    READY   STATUS"
    echo "web-0   1/1     Running"
    ;;
  *)
    echo "error: unknown command \"$1\" for \"kubectl\"" >&2
    exit 1
    ;;
esac
"#;

struct Workspace {
    _temp: TempDir,
    layout: WorkspaceLayout,
    kubectl: String,
}

impl Workspace {
    fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let layout = WorkspaceLayout::from_root(&temp.path().join("app"));
        layout.initialize().expect("initialize workspace layout");
        let kubectl = write_executable(temp.path(), "kubectl", FAKE_KUBECTL_SCRIPT);
        Self {
            _temp: temp,
            layout,
            kubectl,
        }
    }

    fn config(
        &self,
        path_policy: PathPolicy,
        max_concurrent_processes: usize,
    ) -> McpGatewayServerConfig {
        let mut operations = OperationSetConfig::new(self.layout.clone());
        operations.kubectl_program = self.kubectl.clone();
        operations.path_policy = path_policy;
        operations.max_concurrent_processes = max_concurrent_processes;
        McpGatewayServerConfig {
            bind: "127.0.0.1:0".to_string(),
            operations,
            dispatch_audit_log: true,
            audit_rotation: RotationLimits::default(),
        }
    }
}

fn write_executable(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, body).expect("write executable");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod executable");
    }
    path.display().to_string()
}

async fn serve(config: &McpGatewayServerConfig) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral listener");
    let addr = listener.local_addr().expect("listener addr");
    let app = build_mcp_gateway_router(config.build_dispatcher());
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    (addr, handle)
}

async fn call(client: &Client, addr: SocketAddr, method: &str, params: Value) -> Value {
    let response = client
        .post(format!("http://{addr}/mcp"))
        .json(&json!({ "method": method, "params": params }))
        .send()
        .await
        .expect("send mcp request");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    response.json::<Value>().await.expect("decode envelope")
}

#[tokio::test]
async fn integration_write_list_apply_and_script_share_one_workspace() {
    let workspace = Workspace::new();
    let config = workspace.config(PathPolicy::Permissive, 0);
    let (addr, handle) = serve(&config).await;
    let client = Client::new();

    let manifest = "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n";
    let written = call(
        &client,
        addr,
        "write_yaml_manifest",
        json!({ "yaml": manifest, "filename": "web.yaml" }),
    )
    .await;
    assert_eq!(written["success"], true);
    assert_eq!(written["error"], Value::Null);
    let manifest_path = written["result"]["path"]
        .as_str()
        .expect("manifest path")
        .to_string();
    assert_eq!(written["result"]["size"], manifest.len());
    assert_eq!(written["result"]["exists"], true);

    let listed = call(&client, addr, "list_manifests", json!({})).await;
    assert_eq!(listed["success"], true);
    assert_eq!(listed["result"]["count"], 1);
    assert_eq!(listed["result"]["manifests"][0]["name"], "web.yaml");
    assert_eq!(listed["result"]["manifests"][0]["path"], manifest_path);

    let applied = call(
        &client,
        addr,
        "execute_kubectl",
        json!({ "command": ["apply", "-f", manifest_path] }),
    )
    .await;
    assert_eq!(applied["success"], true);
    assert_eq!(applied["result"]["exit_code"], 0);
    assert_eq!(applied["result"]["stdout"], "deployment.apps/web created\n");
    assert_eq!(
        applied["result"]["command"],
        format!("{} apply -f {manifest_path}", workspace.kubectl)
    );

    let script = format!("set -e\ntest -f '{manifest_path}'\necho manifest-present\n");
    let ran = call(
        &client,
        addr,
        "execute_bash_script",
        json!({ "script": script, "name": "check" }),
    )
    .await;
    assert_eq!(ran["success"], true, "{ran}");
    assert_eq!(ran["result"]["stdout"], "manifest-present\n");
    let script_path = workspace.layout.scripts_dir.join("check.sh");
    assert_eq!(ran["result"]["script_path"], script_path.display().to_string());
    assert!(script_path.exists(), "scripts stay on disk after execution");

    let audit_path = workspace.layout.logs_dir.join(DISPATCH_AUDIT_LOG_FILE);
    let audit = std::fs::read_to_string(audit_path).expect("read audit log");
    let methods = audit
        .lines()
        .map(|line| serde_json::from_str::<Value>(line).expect("audit json"))
        .map(|record| record["method"].as_str().unwrap_or_default().to_string())
        .collect::<Vec<_>>();
    assert_eq!(
        methods,
        vec![
            "write_yaml_manifest",
            "list_manifests",
            "execute_kubectl",
            "execute_bash_script"
        ]
    );

    handle.abort();
}

#[tokio::test]
async fn integration_failed_kubectl_reports_error_and_result_together() {
    let workspace = Workspace::new();
    let config = workspace.config(PathPolicy::Permissive, 0);
    let (addr, handle) = serve(&config).await;
    let client = Client::new();

    let failed = call(
        &client,
        addr,
        "execute_kubectl",
        json!({ "command": ["rollout", "status", "deploy/web"] }),
    )
    .await;

    assert_eq!(failed["success"], false);
    assert_eq!(failed["result"]["exit_code"], 1);
    let error = failed["error"].as_str().expect("error text");
    assert!(error.starts_with("kubectl command failed: "));
    assert!(error.contains("unknown command \"rollout\""));
    assert_eq!(
        failed["result"]["stderr"].as_str(),
        error.strip_prefix("kubectl command failed: ")
    );

    handle.abort();
}

#[tokio::test]
async fn integration_confined_policy_rejects_traversal_names() {
    let workspace = Workspace::new();
    let config = workspace.config(PathPolicy::Confined, 0);
    let (addr, handle) = serve(&config).await;
    let client = Client::new();

    let manifest = call(
        &client,
        addr,
        "write_yaml_manifest",
        json!({ "yaml": "kind: Namespace\n", "filename": "../escape.yaml" }),
    )
    .await;
    assert_eq!(manifest["success"], false);
    assert!(manifest["error"]
        .as_str()
        .expect("error text")
        .starts_with("Failed to write manifest: "));
    assert!(!workspace.layout.manifests_dir.join("../escape.yaml").exists());

    let script = call(
        &client,
        addr,
        "execute_bash_script",
        json!({ "script": "echo hi", "name": "../escape" }),
    )
    .await;
    assert_eq!(script["success"], false);
    assert_eq!(script["result"]["exit_code"], -1);
    assert_eq!(script["result"]["script_path"], "");
    assert!(!workspace.layout.scripts_dir.join("../escape.sh").exists());

    handle.abort();
}

#[tokio::test]
async fn integration_bounded_fan_out_still_completes_every_request() {
    let workspace = Workspace::new();
    let config = workspace.config(PathPolicy::Permissive, 1);
    let (addr, handle) = serve(&config).await;
    let client = Client::new();

    let requests = (0..4).map(|index| {
        let client = client.clone();
        async move {
            call(
                &client,
                addr,
                "execute_bash_script",
                json!({
                    "script": format!("sleep 0.05\necho worker-{index}"),
                    "name": format!("worker-{index}"),
                }),
            )
            .await
        }
    });
    let handles = requests.map(tokio::spawn).collect::<Vec<_>>();

    for (index, join) in handles.into_iter().enumerate() {
        let response = join.await.expect("join request task");
        assert_eq!(response["success"], true, "{response}");
        assert_eq!(response["result"]["stdout"], format!("worker-{index}\n"));
    }

    handle.abort();
}
