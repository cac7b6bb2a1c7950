use std::str::FromStr;
use std::time::Instant;

use kmcp_core::elapsed_ms;
use kmcp_ops::{
    ManifestStoreError, OperationSet, ProcessOutcome, DEFAULT_MANIFEST_FILENAME,
    DEFAULT_SCRIPT_NAME,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::dispatch_audit::{DispatchAuditLogger, DispatchAuditRecord};

pub const METHOD_EXECUTE_BASH_SCRIPT: &str = "execute_bash_script";
pub const METHOD_WRITE_YAML_MANIFEST: &str = "write_yaml_manifest";
pub const METHOD_EXECUTE_KUBECTL: &str = "execute_kubectl";
pub const METHOD_LIST_MANIFESTS: &str = "list_manifests";
pub const SUPPORTED_METHODS: [&str; 4] = [
    METHOD_EXECUTE_BASH_SCRIPT,
    METHOD_WRITE_YAML_MANIFEST,
    METHOD_EXECUTE_KUBECTL,
    METHOD_LIST_MANIFESTS,
];

const SCRIPT_REQUIRED_MESSAGE: &str = "Script content is required";
const YAML_REQUIRED_MESSAGE: &str = "YAML content is required";
const KUBECTL_COMMAND_REQUIRED_MESSAGE: &str = "kubectl command is required";
const SCRIPT_FAILURE_PREFIX: &str = "Script execution failed";
const KUBECTL_FAILURE_PREFIX: &str = "kubectl command failed";
const PROCESS_FAILED_KIND: &str = "process_failed";

/// One of the four dispatchable operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpMethod {
    ExecuteBashScript,
    WriteYamlManifest,
    ExecuteKubectl,
    ListManifests,
}

impl McpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExecuteBashScript => METHOD_EXECUTE_BASH_SCRIPT,
            Self::WriteYamlManifest => METHOD_WRITE_YAML_MANIFEST,
            Self::ExecuteKubectl => METHOD_EXECUTE_KUBECTL,
            Self::ListManifests => METHOD_LIST_MANIFESTS,
        }
    }
}

impl FromStr for McpMethod {
    type Err = McpDispatchError;

    /// Exact, case-sensitive match.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            METHOD_EXECUTE_BASH_SCRIPT => Ok(Self::ExecuteBashScript),
            METHOD_WRITE_YAML_MANIFEST => Ok(Self::WriteYamlManifest),
            METHOD_EXECUTE_KUBECTL => Ok(Self::ExecuteKubectl),
            METHOD_LIST_MANIFESTS => Ok(Self::ListManifests),
            other => Err(McpDispatchError::UnknownMethod(other.to_string())),
        }
    }
}

/// Request body accepted on `/mcp`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct McpRequest {
    pub method: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl McpRequest {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params: match params {
                Value::Object(params) => params,
                _ => Map::new(),
            },
        }
    }
}

/// Uniform `{success, result, error}` envelope. Unset fields serialize as `null`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct McpResponse {
    pub success: bool,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl McpResponse {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Failure that still carries the raw operation result.
    pub fn failure_with_result(error: impl Into<String>, result: Value) -> Self {
        Self {
            success: false,
            result: Some(result),
            error: Some(error.into()),
        }
    }

    pub fn exit_code(&self) -> Option<i64> {
        self.result
            .as_ref()
            .and_then(|result| result.get("exit_code"))
            .and_then(Value::as_i64)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum McpDispatchError {
    #[error("Unknown method: {0}")]
    UnknownMethod(String),
    #[error("{0}")]
    MissingParameter(&'static str),
    #[error("{field} must be {expected}")]
    InvalidParameter {
        field: &'static str,
        expected: &'static str,
    },
    #[error(transparent)]
    Manifest(#[from] ManifestStoreError),
    #[error("failed to encode {method} result: {detail}")]
    Encode {
        method: &'static str,
        detail: String,
    },
}

impl McpDispatchError {
    /// Stable category used in the audit log in place of the message text.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownMethod(_) => "unknown_method",
            Self::MissingParameter(_) => "missing_parameter",
            Self::InvalidParameter { .. } => "invalid_parameter",
            Self::Manifest(ManifestStoreError::Write(_)) => "manifest_write",
            Self::Manifest(ManifestStoreError::List(_)) => "manifest_list",
            Self::Encode { .. } => "encode",
        }
    }
}

/// Validates parameters, runs the selected operation and builds the envelope.
#[derive(Debug, Clone)]
pub struct McpDispatcher {
    operations: OperationSet,
    audit: Option<DispatchAuditLogger>,
}

impl McpDispatcher {
    pub fn new(operations: OperationSet) -> Self {
        Self {
            operations,
            audit: None,
        }
    }

    pub fn with_audit_logger(mut self, audit: DispatchAuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Never fails: every fault ends up in the envelope's `error`.
    pub async fn dispatch(&self, request: &McpRequest) -> McpResponse {
        let started = Instant::now();
        let (response, error_kind) = match self.dispatch_method(request).await {
            Ok(response) if response.success => (response, None),
            Ok(response) => (response, Some(PROCESS_FAILED_KIND)),
            Err(error) => (McpResponse::failure(error.to_string()), Some(error.kind())),
        };
        let duration_ms = elapsed_ms(started);

        if response.success {
            tracing::debug!(method = %request.method, duration_ms, "mcp request succeeded");
        } else {
            tracing::warn!(
                method = %request.method,
                duration_ms,
                exit_code = response.exit_code(),
                error = response.error.as_deref().unwrap_or_default(),
                "mcp request failed"
            );
        }
        if let Some(audit) = &self.audit {
            let record =
                DispatchAuditRecord::new(&request.method, &response, error_kind, duration_ms);
            if let Err(error) = audit.record(&record) {
                tracing::warn!(%error, "failed to append dispatch audit record");
            }
        }
        response
    }

    async fn dispatch_method(&self, request: &McpRequest) -> Result<McpResponse, McpDispatchError> {
        let method = request.method.parse::<McpMethod>()?;
        let params = &request.params;
        match method {
            McpMethod::ExecuteBashScript => {
                let script = required_text(params, "script", SCRIPT_REQUIRED_MESSAGE)?;
                let name = optional_text(params, "name", DEFAULT_SCRIPT_NAME)?;
                let outcome = self.operations.execute_bash_script(script, name).await;
                process_outcome_response(method, outcome, SCRIPT_FAILURE_PREFIX)
            }
            McpMethod::WriteYamlManifest => {
                let yaml = required_text(params, "yaml", YAML_REQUIRED_MESSAGE)?;
                let filename = optional_text(params, "filename", DEFAULT_MANIFEST_FILENAME)?;
                let report = self.operations.write_yaml_manifest(yaml, filename).await?;
                Ok(McpResponse::ok(encode_result(method, &report)?))
            }
            McpMethod::ExecuteKubectl => {
                let command = required_command(params)?;
                let outcome = self.operations.execute_kubectl(&command).await;
                process_outcome_response(method, outcome, KUBECTL_FAILURE_PREFIX)
            }
            McpMethod::ListManifests => {
                let listing = self.operations.list_manifests().await?;
                Ok(McpResponse::ok(encode_result(method, &listing)?))
            }
        }
    }
}

fn encode_result<T: Serialize>(method: McpMethod, value: &T) -> Result<Value, McpDispatchError> {
    serde_json::to_value(value).map_err(|error| McpDispatchError::Encode {
        method: method.as_str(),
        detail: error.to_string(),
    })
}

/// Exit code 0 is success; anything else reports stderr in `error` and keeps the result.
fn process_outcome_response(
    method: McpMethod,
    outcome: ProcessOutcome,
    failure_prefix: &str,
) -> Result<McpResponse, McpDispatchError> {
    let result = encode_result(method, &outcome)?;
    if outcome.succeeded() {
        return Ok(McpResponse::ok(result));
    }
    Ok(McpResponse::failure_with_result(
        format!("{failure_prefix}: {}", outcome.stderr),
        result,
    ))
}

/// Absent, `null` and `""` all count as missing.
fn required_text<'a>(
    params: &'a Map<String, Value>,
    field: &'static str,
    missing_message: &'static str,
) -> Result<&'a str, McpDispatchError> {
    match params.get(field) {
        None | Some(Value::Null) => Err(McpDispatchError::MissingParameter(missing_message)),
        Some(Value::String(text)) if text.is_empty() => {
            Err(McpDispatchError::MissingParameter(missing_message))
        }
        Some(Value::String(text)) => Ok(text.as_str()),
        Some(_) => Err(McpDispatchError::InvalidParameter {
            field,
            expected: "a string",
        }),
    }
}

fn optional_text<'a>(
    params: &'a Map<String, Value>,
    field: &'static str,
    default: &'static str,
) -> Result<&'a str, McpDispatchError> {
    match params.get(field) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::String(text)) => Ok(text.as_str()),
        Some(_) => Err(McpDispatchError::InvalidParameter {
            field,
            expected: "a string",
        }),
    }
}

fn required_command(params: &Map<String, Value>) -> Result<Vec<String>, McpDispatchError> {
    let invalid = McpDispatchError::InvalidParameter {
        field: "command",
        expected: "an array of strings",
    };
    match params.get("command") {
        None | Some(Value::Null) => Err(McpDispatchError::MissingParameter(
            KUBECTL_COMMAND_REQUIRED_MESSAGE,
        )),
        Some(Value::Array(items)) if items.is_empty() => Err(
            McpDispatchError::MissingParameter(KUBECTL_COMMAND_REQUIRED_MESSAGE),
        ),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid.clone())
            })
            .collect(),
        Some(_) => Err(invalid),
    }
}
