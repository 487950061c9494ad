//! Built-in task handlers available to definition files.
//!
//! | name    | inputs                 | output                              |
//! |---------|------------------------|-------------------------------------|
//! | `echo`  | anything               | the resolved inputs as an object    |
//! | `sleep` | `duration_ms`          | `{"slept_ms": n}`                   |
//! | `fail`  | `message` (optional)   | always errors                       |
//! | `shell` | `command`              | `{"stdout", "stderr", "exit_code"}` |

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use taskweave_core::handler::{HandlerError, HandlerRegistry, TaskHandler, TaskInputs};
use taskweave_types::task::TaskSpec;

/// Returns its resolved inputs unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

impl TaskHandler for EchoHandler {
    async fn handle(
        &self,
        inputs: TaskInputs,
        _context: Arc<Value>,
        _task: Arc<TaskSpec>,
    ) -> Result<Value, HandlerError> {
        Ok(json!(inputs))
    }
}

/// Sleeps for `duration_ms` milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepHandler;

impl TaskHandler for SleepHandler {
    async fn handle(
        &self,
        inputs: TaskInputs,
        _context: Arc<Value>,
        _task: Arc<TaskSpec>,
    ) -> Result<Value, HandlerError> {
        let ms = match inputs.get("duration_ms") {
            None => 0,
            Some(value) => value.as_u64().ok_or_else(|| {
                HandlerError::InvalidInput("'duration_ms' must be a non-negative integer".into())
            })?,
        };
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(json!({ "slept_ms": ms }))
    }
}

/// Always fails, with `message` if given.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailHandler;

impl TaskHandler for FailHandler {
    async fn handle(
        &self,
        inputs: TaskInputs,
        _context: Arc<Value>,
        task: Arc<TaskSpec>,
    ) -> Result<Value, HandlerError> {
        let message = inputs
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("task '{}' failed", task.id));
        Err(HandlerError::Failed(message))
    }
}

/// Runs `command` through `sh -c`. A non-zero exit status is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellHandler;

impl TaskHandler for ShellHandler {
    async fn handle(
        &self,
        inputs: TaskInputs,
        _context: Arc<Value>,
        task: Arc<TaskSpec>,
    ) -> Result<Value, HandlerError> {
        let command = inputs
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| HandlerError::InvalidInput("missing 'command'".into()))?;

        tracing::debug!(task_id = %task.id, %command, "running shell command");
        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .kill_on_drop(true)
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
        let exit_code = output.status.code();

        if !output.status.success() {
            let code = exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string());
            return Err(HandlerError::Failed(format!(
                "command exited with {code}: {stderr}"
            )));
        }

        Ok(json!({
            "stdout": stdout,
            "stderr": stderr,
            "exit_code": exit_code,
        }))
    }
}

/// Registry holding every built-in handler under its name.
pub fn builtin_handlers() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register("echo", EchoHandler);
    registry.register("sleep", SleepHandler);
    registry.register("fail", FailHandler);
    registry.register("shell", ShellHandler);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> Arc<TaskSpec> {
        Arc::new(TaskSpec::new("t", "T"))
    }

    fn ctx() -> Arc<Value> {
        Arc::new(json!({}))
    }

    fn inputs(pairs: &[(&str, Value)]) -> TaskInputs {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn registry_has_all_builtins() {
        assert_eq!(builtin_handlers().names(), vec!["echo", "fail", "shell", "sleep"]);
    }

    #[tokio::test]
    async fn echo_returns_inputs() {
        let out = EchoHandler
            .handle(inputs(&[("a", json!(1)), ("upstream-x", json!("y"))]), ctx(), task())
            .await
            .unwrap();
        assert_eq!(out, json!({"a": 1, "upstream-x": "y"}));
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_waits_requested_duration() {
        let start = tokio::time::Instant::now();
        let out = SleepHandler
            .handle(inputs(&[("duration_ms", json!(250))]), ctx(), task())
            .await
            .unwrap();
        assert_eq!(out, json!({"slept_ms": 250}));
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test]
    async fn sleep_rejects_bad_duration() {
        let err = SleepHandler
            .handle(inputs(&[("duration_ms", json!("soon"))]), ctx(), task())
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn fail_uses_message_or_default() {
        let err = FailHandler
            .handle(inputs(&[("message", json!("disk full"))]), ctx(), task())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "disk full");

        let err = FailHandler.handle(TaskInputs::new(), ctx(), task()).await.unwrap_err();
        assert_eq!(err.to_string(), "task 't' failed");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn shell_captures_stdout() {
        let out = ShellHandler
            .handle(inputs(&[("command", json!("echo hello"))]), ctx(), task())
            .await
            .unwrap();
        assert_eq!(out["stdout"], json!("hello"));
        assert_eq!(out["exit_code"], json!(0));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn shell_nonzero_exit_is_error() {
        let err = ShellHandler
            .handle(inputs(&[("command", json!("echo oops >&2; exit 3"))]), ctx(), task())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "command exited with 3: oops");
    }

    #[tokio::test]
    async fn shell_requires_command() {
        let err = ShellHandler.handle(TaskInputs::new(), ctx(), task()).await.unwrap_err();
        assert!(matches!(err, HandlerError::InvalidInput(_)));
    }
}
