use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use kmcp_core::{current_unix_timestamp_ms, RotatingNdjsonLog, RotationLimits};
use serde::Serialize;

use crate::mcp_dispatch::McpResponse;

pub const DISPATCH_AUDIT_LOG_FILE: &str = "dispatch-audit.jsonl";
const DISPATCH_AUDIT_RECORD_TYPE: &str = "mcp_dispatch_v1";
const DISPATCH_AUDIT_SCHEMA_VERSION: u32 = 1;

/// One line of `dispatch-audit.jsonl`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DispatchAuditRecord<'a> {
    pub record_type: &'static str,
    pub schema_version: u32,
    pub timestamp_unix_ms: u64,
    pub method: &'a str,
    pub success: bool,
    pub error_kind: Option<&'static str>,
    pub exit_code: Option<i64>,
    pub duration_ms: u64,
}

impl<'a> DispatchAuditRecord<'a> {
    pub fn new(
        method: &'a str,
        response: &McpResponse,
        error_kind: Option<&'static str>,
        duration_ms: u64,
    ) -> Self {
        Self {
            record_type: DISPATCH_AUDIT_RECORD_TYPE,
            schema_version: DISPATCH_AUDIT_SCHEMA_VERSION,
            timestamp_unix_ms: current_unix_timestamp_ms(),
            method,
            success: response.success,
            error_kind,
            exit_code: response.exit_code(),
            duration_ms,
        }
    }
}

/// Appends one NDJSON record per dispatched request under the logs directory.
///
/// Only the method, outcome, error category, exit code and duration are kept.
/// Parameters and error text (which may embed child stderr or file paths) are
/// never written.
#[derive(Debug, Clone)]
pub struct DispatchAuditLogger {
    log: Arc<RotatingNdjsonLog>,
}

impl DispatchAuditLogger {
    pub fn new(logs_dir: &Path, limits: RotationLimits) -> Self {
        Self {
            log: Arc::new(RotatingNdjsonLog::new(
                logs_dir.join(DISPATCH_AUDIT_LOG_FILE),
                limits,
            )),
        }
    }

    pub fn path(&self) -> &Path {
        self.log.path()
    }

    pub fn record(&self, record: &DispatchAuditRecord<'_>) -> Result<()> {
        let path = self.path();
        self.log
            .append(record)
            .with_context(|| format!("failed to write dispatch audit log {}", path.display()))
    }
}
