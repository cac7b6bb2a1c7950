use thiserror::Error;

use crate::process_runtime::{
    run_captured_process, ProcessContextField, ProcessLimiter, ProcessOutcome,
};

pub const DEFAULT_KUBECTL_PROGRAM: &str = "kubectl";
const KUBECTL_PREFLIGHT_ARGS: [&str; 2] = ["version", "--client"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreflightError {
    #[error("kubectl not available: '{command}' exited with code {exit_code}: {detail}")]
    KubectlUnavailable {
        command: String,
        exit_code: i32,
        detail: String,
    },
}

/// Space-joined argv, as reported in the `command` result field.
pub fn render_kubectl_command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs `<program> <args..>`; never fails, spawn errors become an exit code of -1.
pub async fn execute_kubectl_command(
    program: &str,
    args: &[String],
    limiter: &ProcessLimiter,
) -> ProcessOutcome {
    let command_line = render_kubectl_command_line(program, args);
    tracing::debug!(command = %command_line, "running kubectl");
    run_captured_process(
        program,
        args,
        ProcessContextField::Command,
        command_line,
        limiter,
    )
    .await
}

/// Startup check: `kubectl version --client` must run and exit 0.
pub async fn verify_kubectl_available(program: &str) -> Result<ProcessOutcome, PreflightError> {
    let args = KUBECTL_PREFLIGHT_ARGS.map(str::to_string);
    let outcome = execute_kubectl_command(program, &args, &ProcessLimiter::default()).await;
    if outcome.succeeded() {
        return Ok(outcome);
    }
    let detail = outcome.stderr.trim();
    Err(PreflightError::KubectlUnavailable {
        command: render_kubectl_command_line(program, &args),
        exit_code: outcome.exit_code,
        detail: if detail.is_empty() {
            "no diagnostic output".to_string()
        } else {
            detail.to_string()
        },
    })
}
