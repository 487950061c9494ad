//! Optional lifecycle callbacks.
//!
//! Callbacks run inline with scheduling (inside runners for task events,
//! on the control loop for workflow completion). They must return quickly.
//! A panicking callback is logged and otherwise ignored; it never changes a
//! task's recorded outcome.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use taskweave_types::task::{TaskResult, TaskSpec};
use taskweave_types::workflow::WorkflowResult;

use super::runner::panic_message;

pub type TaskStartFn = Arc<dyn Fn(&TaskSpec) + Send + Sync>;
pub type TaskCompleteFn = Arc<dyn Fn(&TaskSpec, &TaskResult) + Send + Sync>;
pub type WorkflowCompleteFn = Arc<dyn Fn(&WorkflowResult) + Send + Sync>;

/// The three optional callbacks an orchestrator can carry.
#[derive(Clone, Default)]
pub struct WorkflowHooks {
    pub on_task_start: Option<TaskStartFn>,
    pub on_task_complete: Option<TaskCompleteFn>,
    pub on_workflow_complete: Option<WorkflowCompleteFn>,
}

impl WorkflowHooks {
    /// Fired at the start of every attempt.
    pub fn task_started(&self, spec: &TaskSpec) {
        if let Some(hook) = &self.on_task_start {
            guarded("on_task_start", || hook(spec));
        }
    }

    /// Fired once per executed task with its final result.
    pub fn task_completed(&self, spec: &TaskSpec, result: &TaskResult) {
        if let Some(hook) = &self.on_task_complete {
            guarded("on_task_complete", || hook(spec, result));
        }
    }

    pub fn workflow_completed(&self, result: &WorkflowResult) {
        if let Some(hook) = &self.on_workflow_complete {
            guarded("on_workflow_complete", || hook(result));
        }
    }
}

fn guarded(hook: &'static str, f: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        tracing::warn!(hook, panic = %panic_message(payload.as_ref()), "lifecycle hook panicked");
    }
}

impl fmt::Debug for WorkflowHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowHooks")
            .field("on_task_start", &self.on_task_start.is_some())
            .field("on_task_complete", &self.on_task_complete.is_some())
            .field("on_workflow_complete", &self.on_workflow_complete.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use taskweave_types::task::TaskStatus;

    fn explode(_: &TaskSpec, _: &TaskResult) {
        panic!("bad callback");
    }

    #[test]
    fn panicking_hook_is_contained() {
        let hooks = WorkflowHooks {
            on_task_complete: Some(Arc::new(explode)),
            ..Default::default()
        };
        let spec = TaskSpec::new("a", "A");
        let result = TaskResult::synthetic("a", TaskStatus::Skipped, "x");
        hooks.task_completed(&spec, &result);
    }

    #[test]
    fn hooks_fire_when_set() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let hooks = WorkflowHooks {
            on_task_start: Some(Arc::new(move |_: &TaskSpec| {
                seen.fetch_add(1, Ordering::SeqCst);
            })),
            ..Default::default()
        };
        hooks.task_started(&TaskSpec::new("a", "A"));
        hooks.task_started(&TaskSpec::new("b", "B"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
