//! Executor that runs each step as a local process.
//!
//! The step is written to the child's stdin as JSON, and its id, plan and
//! action are exported as `CAIRN_STEP_ID`, `CAIRN_PLAN_ID` and
//! `CAIRN_ACTION`. Exit status 0 completes the step with the child's stdout
//! (parsed as JSON when possible); any other status fails it with stderr.

use std::{io::ErrorKind, process::Stdio};

use async_trait::async_trait;
use cairn_core::{ExecutionOutcome, Executor, ExecutorError, Step};
use log::debug;
use serde_json::Value;
use tokio::{io::AsyncWriteExt, process::Command};

pub struct CommandExecutor {
    program: String,
    args: Vec<String>,
}

impl CommandExecutor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl Executor for CommandExecutor {
    async fn execute(&self, step: Step) -> Result<ExecutionOutcome, ExecutorError> {
        let payload = serde_json::to_vec(&step)
            .map_err(|e| ExecutorError::new(format!("cannot encode step {}: {e}", step.id)))?;

        debug!("running {} for step {}", self.program, step.id);
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env("CAIRN_STEP_ID", &step.id)
            .env("CAIRN_PLAN_ID", &step.plan_id)
            .env("CAIRN_ACTION", &step.action)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecutorError::new(format!("cannot start {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A child that never reads its input closes the pipe early.
            if let Err(e) = stdin.write_all(&payload).await {
                if e.kind() != ErrorKind::BrokenPipe {
                    return Err(ExecutorError::new(format!(
                        "cannot write step {} to {}: {e}",
                        step.id, self.program
                    )));
                }
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExecutorError::new(format!("{} did not finish: {e}", self.program)))?;

        if output.status.success() {
            return Ok(ExecutionOutcome::Completed(parse_stdout(&output.stdout)));
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(ExecutorError::new(if stderr.is_empty() {
            format!("{} exited with {}", self.program, output.status)
        } else {
            stderr
        }))
    }
}

fn parse_stdout(stdout: &[u8]) -> Value {
    let text = String::from_utf8_lossy(stdout);
    let text = text.trim();
    if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use serde_json::json;

    use super::*;

    fn step() -> Step {
        serde_json::from_value(json!({
            "id": "render",
            "plan_id": "launch",
            "step_index": 0,
            "position": 0,
            "description": "Render the hero image",
            "action": "image.render",
            "params": {"size": 1024},
            "depends_on": [],
            "status": "in_progress",
            "created_at": "2026-10-01T09:00:00Z",
            "updated_at": "2026-10-01T09:00:00Z"
        }))
        .unwrap()
    }

    fn sh(script: &str) -> CommandExecutor {
        CommandExecutor::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[tokio::test]
    async fn test_json_stdout_becomes_result() {
        let outcome = sh(r#"echo '{"frames": 3}'"#).execute(step()).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed(json!({"frames": 3})));
    }

    #[tokio::test]
    async fn test_step_is_passed_on_stdin_and_env() {
        let outcome = sh(r#"cat >/dev/null; printf '%s/%s' "$CAIRN_PLAN_ID" "$CAIRN_ACTION""#)
            .execute(step())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ExecutionOutcome::Completed(json!("launch/image.render"))
        );

        let ExecutionOutcome::Completed(echoed) = sh("cat").execute(step()).await.unwrap() else {
            panic!("expected a completed outcome");
        };
        assert_eq!(echoed["id"], "render");
        assert_eq!(echoed["params"]["size"], 1024);
    }

    #[tokio::test]
    async fn test_empty_stdout_is_null() {
        let outcome = sh("true").execute(step()).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed(Value::Null));
    }

    #[tokio::test]
    async fn test_nonzero_exit_fails_with_stderr() {
        let err = sh("echo 'out of memory' >&2; exit 3")
            .execute(step())
            .await
            .unwrap_err();
        assert_eq!(err.message, "out of memory");

        let err = sh("exit 4").execute(step()).await.unwrap_err();
        assert!(err.message.starts_with("sh exited with"));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = CommandExecutor::new("cairn-no-such-program", Vec::new())
            .execute(step())
            .await
            .unwrap_err();
        assert!(err.message.starts_with("cannot start cairn-no-such-program"));
    }
}
