use std::process::ExitStatus;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tokio::process::Command;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Exit code reported when the child never ran.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = -1;

/// Which context key accompanies a captured process result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessContextField {
    Command,
    ScriptPath,
}

impl ProcessContextField {
    pub fn key(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::ScriptPath => "script_path",
        }
    }
}

/// Fully materialized result of one child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub context_field: ProcessContextField,
    pub context: String,
}

impl ProcessOutcome {
    /// Result synthesized when the process could not be started at all.
    pub fn spawn_failure(context_field: ProcessContextField, message: impl Into<String>) -> Self {
        Self {
            exit_code: SPAWN_FAILURE_EXIT_CODE,
            stdout: String::new(),
            stderr: message.into(),
            context_field,
            context: String::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

impl Serialize for ProcessOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("exit_code", &self.exit_code)?;
        map.serialize_entry("stdout", &self.stdout)?;
        map.serialize_entry("stderr", &self.stderr)?;
        map.serialize_entry(self.context_field.key(), &self.context)?;
        map.end()
    }
}

/// Optional cap on simultaneously running children. Unbounded by default.
#[derive(Debug, Clone, Default)]
pub struct ProcessLimiter {
    permits: Option<Arc<Semaphore>>,
}

impl ProcessLimiter {
    /// `0` keeps the limiter unbounded.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: (max_concurrent > 0).then(|| Arc::new(Semaphore::new(max_concurrent))),
        }
    }

    pub fn available_permits(&self) -> Option<usize> {
        self.permits
            .as_ref()
            .map(|permits| permits.available_permits())
    }

    async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        let permits = self.permits.as_ref()?;
        Arc::clone(permits).acquire_owned().await.ok()
    }
}

/// Runs `program args..` to completion and captures both output streams.
///
/// The child inherits the server environment and gets a closed stdin. There is
/// no timeout: the call resolves only when the child exits.
pub async fn run_captured_process(
    program: &str,
    args: &[String],
    context_field: ProcessContextField,
    context: String,
    limiter: &ProcessLimiter,
) -> ProcessOutcome {
    let _permit = limiter.acquire().await;
    let mut command = Command::new(program);
    command.args(args);

    let output = match command.output().await {
        Ok(output) => output,
        Err(error) => {
            tracing::warn!(program, %error, "failed to spawn process");
            return ProcessOutcome::spawn_failure(context_field, error.to_string());
        }
    };

    let exit_code = exit_code_from_status(&output.status);
    tracing::debug!(program, exit_code, "process finished");
    ProcessOutcome {
        exit_code,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        context_field,
        context,
    }
}

/// Signal-terminated children report the negated signal number.
pub fn exit_code_from_status(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    SPAWN_FAILURE_EXIT_CODE
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    fn sh_args(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn captures_stdout_stderr_and_exit_code() {
        let outcome = run_captured_process(
            "sh",
            &sh_args("echo out; echo err >&2; exit 3"),
            ProcessContextField::Command,
            "sh -c ...".to_string(),
            &ProcessLimiter::default(),
        )
        .await;

        assert_eq!(outcome.exit_code, 3);
        assert_eq!(outcome.stdout, "out\n");
        assert_eq!(outcome.stderr, "err\n");
        assert_eq!(outcome.context, "sh -c ...");
        assert!(!outcome.succeeded());
    }

    #[tokio::test]
    async fn spawn_failure_yields_minus_one_with_empty_context() {
        let outcome = run_captured_process(
            "kmcp-test-binary-that-does-not-exist",
            &[],
            ProcessContextField::Command,
            "kmcp-test-binary-that-does-not-exist".to_string(),
            &ProcessLimiter::default(),
        )
        .await;

        assert_eq!(outcome.exit_code, SPAWN_FAILURE_EXIT_CODE);
        assert_eq!(outcome.stdout, "");
        assert!(!outcome.stderr.is_empty());
        assert_eq!(outcome.context, "");
    }

    #[tokio::test]
    async fn child_inherits_server_environment() {
        std::env::set_var("KMCP_PROCESS_RUNTIME_TEST_VAR", "inherited");
        let outcome = run_captured_process(
            "sh",
            &sh_args("printf %s \"$KMCP_PROCESS_RUNTIME_TEST_VAR\""),
            ProcessContextField::Command,
            String::new(),
            &ProcessLimiter::default(),
        )
        .await;

        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout, "inherited");
    }

    #[tokio::test]
    async fn invalid_utf8_output_is_decoded_lossily() {
        let outcome = run_captured_process(
            "sh",
            &sh_args("printf 'ok\\377'"),
            ProcessContextField::Command,
            String::new(),
            &ProcessLimiter::default(),
        )
        .await;

        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.stdout.starts_with("ok"));
        assert!(outcome.stdout.contains('\u{fffd}'));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn signal_termination_reports_negative_signal_number() {
        let outcome = run_captured_process(
            "sh",
            &sh_args("kill -9 $$"),
            ProcessContextField::Command,
            String::new(),
            &ProcessLimiter::default(),
        )
        .await;

        assert_eq!(outcome.exit_code, -9);
    }

    #[test]
    fn outcome_serializes_with_context_key() {
        let outcome = ProcessOutcome {
            exit_code: 0,
            stdout: "hello\n".to_string(),
            stderr: String::new(),
            context_field: ProcessContextField::ScriptPath,
            context: "/app/scripts/temp_script.sh".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&outcome).expect("serialize"),
            json!({
                "exit_code": 0,
                "stdout": "hello\n",
                "stderr": "",
                "script_path": "/app/scripts/temp_script.sh",
            })
        );
    }

    #[test]
    fn limiter_is_unbounded_for_zero() {
        assert_eq!(ProcessLimiter::new(0).available_permits(), None);
        assert_eq!(ProcessLimiter::default().available_permits(), None);
        assert_eq!(ProcessLimiter::new(2).available_permits(), Some(2));
    }

    #[tokio::test]
    async fn bounded_limiter_holds_permit_while_child_runs() {
        let limiter = ProcessLimiter::new(1);
        let running = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                run_captured_process(
                    "sh",
                    &sh_args("sleep 0.3"),
                    ProcessContextField::Command,
                    String::new(),
                    &limiter,
                )
                .await
            })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(limiter.available_permits(), Some(0));

        let outcome = running.await.expect("join child task");
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(limiter.available_permits(), Some(1));
    }
}
