//! Per-task attempt loop: input resolution, timeout, retries, hooks.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures_util::FutureExt;
use serde_json::{Value, json};
use taskweave_types::task::{TaskResult, TaskSpec};
use tokio::time::Instant;

use crate::handler::{BoxTaskHandler, TaskInputs};

use super::hooks::WorkflowHooks;
use super::retry::{RetryHandler, RetryPolicy};
use super::state::RunState;

/// Input key under which a dependency's output is handed to its dependents.
pub fn upstream_key(dep_id: &str) -> String {
    format!("upstream-{dep_id}")
}

/// Executes one task to a terminal result.
///
/// Cheap to clone; every runner in a wave shares the same [`RunState`].
#[derive(Debug, Clone)]
pub struct TaskRunner {
    state: Arc<RunState>,
    hooks: WorkflowHooks,
}

impl TaskRunner {
    pub fn new(state: Arc<RunState>, hooks: WorkflowHooks) -> Self {
        Self { state, hooks }
    }

    /// Static inputs plus one `upstream-<dep>` entry per dependency that
    /// produced a non-null output.
    pub fn resolve_inputs(&self, spec: &TaskSpec) -> TaskInputs {
        let mut inputs = spec.inputs.clone();
        for dep in &spec.dependencies {
            if let Some(result) = self.state.result(dep) {
                if !result.output.is_null() {
                    inputs.insert(upstream_key(dep), result.output);
                }
            }
        }
        inputs
    }

    /// Run up to `max_retries + 1` attempts and record the final result.
    ///
    /// Handler errors, panics, and timeouts all count as a failed attempt.
    /// The task leaves the running set on every exit path.
    pub async fn run(
        &self,
        spec: Arc<TaskSpec>,
        handler: BoxTaskHandler,
        context: Arc<Value>,
    ) -> TaskResult {
        let inputs = self.resolve_inputs(&spec);
        let policy = RetryPolicy::from_spec(&spec);
        let started_at = Utc::now();
        let clock = Instant::now();
        let mut retries_used = 0;

        loop {
            let attempt = retries_used + 1;
            self.state.mark_running(&spec.id);
            self.hooks.task_started(&spec);
            tracing::debug!(task_id = %spec.id, attempt, "task attempt started");

            let call = AssertUnwindSafe(handler.handle(
                inputs.clone(),
                Arc::clone(&context),
                Arc::clone(&spec),
            ))
            .catch_unwind();
            let outcome = tokio::time::timeout(spec.timeout, call).await;
            self.state.mark_idle(&spec.id);

            let error = match outcome {
                Ok(Ok(Ok(output))) => {
                    let result =
                        TaskResult::completed(&spec.id, output, started_at, clock.elapsed(), retries_used)
                            .with_metadata("attempts", json!(attempt));
                    return self.finish(&spec, result);
                }
                Ok(Ok(Err(e))) => e.to_string(),
                Ok(Err(panic)) => format!("handler panicked: {}", panic_message(panic.as_ref())),
                Err(_) => format!("timed out after {}ms", spec.timeout.as_millis()),
            };

            if RetryHandler::should_retry(&policy, retries_used) {
                let delay = RetryHandler::next_delay(&policy);
                tracing::warn!(
                    task_id = %spec.id,
                    attempt,
                    max_attempts = policy.max_attempts(),
                    delay_ms = delay.as_millis() as u64,
                    %error,
                    "task attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                retries_used += 1;
                continue;
            }

            tracing::warn!(task_id = %spec.id, attempts = attempt, %error, "task failed");
            let result = TaskResult::failed(&spec.id, error, started_at, clock.elapsed(), retries_used)
                .with_metadata("attempts", json!(attempt));
            return self.finish(&spec, result);
        }
    }

    fn finish(&self, spec: &TaskSpec, result: TaskResult) -> TaskResult {
        self.state.record(result.clone());
        self.hooks.task_completed(spec, &result);
        result
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
