//! Wave-based workflow orchestrator.
//!
//! The control loop repeatedly asks the selector for ready tasks and runs
//! them as a wave on a `JoinSet`. A single `Semaphore` created per
//! execution bounds how many tasks run at once across the whole
//! orchestrator. Task-level failures never escape `execute()`; they are
//! encoded in the returned `WorkflowResult`.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures_util::FutureExt;
use serde_json::Value;
use taskweave_types::config::EngineConfig;
use taskweave_types::task::{TaskResult, TaskSpec, TaskStatus};
use taskweave_types::workflow::{WorkflowCounts, WorkflowResult, WorkflowStatus};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use uuid::Uuid;

use crate::handler::{BoxTaskHandler, TaskHandler};

use super::audit::{AuditSink, NoAuditSink, compute_audit_hash};
use super::dag::execution_plan;
use super::definition::WorkflowError;
use super::hooks::WorkflowHooks;
use super::registry::{Task, TaskRegistry};
use super::runner::TaskRunner;
use super::selector::select_ready;
use super::state::RunState;
use super::visualize::{GraphFormat, render};

/// Default number of concurrently running tasks.
pub const DEFAULT_MAX_CONCURRENT_TASKS: usize = 4;

/// Owns the task registry, the concurrency bound, per-execution run state,
/// lifecycle hooks, and an audit sink.
#[derive(Debug)]
pub struct Orchestrator<S: AuditSink = NoAuditSink> {
    registry: TaskRegistry,
    max_concurrent_tasks: usize,
    state: Arc<RunState>,
    hooks: WorkflowHooks,
    audit: S,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT_TASKS)
    }
}

impl Orchestrator {
    /// An orchestrator with no audit sink. A bound of 0 is treated as 1.
    pub fn new(max_concurrent_tasks: usize) -> Self {
        Self {
            registry: TaskRegistry::new(),
            max_concurrent_tasks: max_concurrent_tasks.max(1),
            state: Arc::new(RunState::new()),
            hooks: WorkflowHooks::default(),
            audit: NoAuditSink,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.max_concurrent_tasks)
    }
}

impl<S: AuditSink> Orchestrator<S> {
    /// Replace the audit sink, keeping tasks, hooks, and state.
    pub fn with_audit_sink<S2: AuditSink>(self, audit: S2) -> Orchestrator<S2> {
        Orchestrator {
            registry: self.registry,
            max_concurrent_tasks: self.max_concurrent_tasks,
            state: self.state,
            hooks: self.hooks,
            audit,
        }
    }

    pub fn max_concurrent_tasks(&self) -> usize {
        self.max_concurrent_tasks
    }

    pub fn set_max_concurrent_tasks(&mut self, max: usize) {
        self.max_concurrent_tasks = max.max(1);
    }

    // -----------------------------------------------------------------------
    // Hooks
    // -----------------------------------------------------------------------

    pub fn with_hooks(mut self, hooks: WorkflowHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn on_task_start(&mut self, f: impl Fn(&TaskSpec) + Send + Sync + 'static) {
        self.hooks.on_task_start = Some(Arc::new(f));
    }

    pub fn on_task_complete(&mut self, f: impl Fn(&TaskSpec, &TaskResult) + Send + Sync + 'static) {
        self.hooks.on_task_complete = Some(Arc::new(f));
    }

    pub fn on_workflow_complete(&mut self, f: impl Fn(&WorkflowResult) + Send + Sync + 'static) {
        self.hooks.on_workflow_complete = Some(Arc::new(f));
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a task, overwriting any task with the same id. Returns the
    /// replaced task.
    pub fn add_task(&mut self, task: Task) -> Option<Task> {
        if self.registry.contains(task.id()) {
            tracing::debug!(task_id = %task.id(), "overwriting registered task");
        }
        self.registry.insert(task)
    }

    /// Build a task from a spec and a handler, then register it.
    pub fn create_task<H: TaskHandler + 'static>(&mut self, spec: TaskSpec, handler: H) -> Option<Task> {
        self.add_task(Task::new(spec).with_handler(handler))
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.registry.get(id)
    }

    /// Registered tasks in registration order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.registry.iter()
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Forget every task and all run state.
    pub fn clear(&mut self) {
        self.registry.clear();
        self.state.clear();
    }

    // -----------------------------------------------------------------------
    // Run state queries
    // -----------------------------------------------------------------------

    pub fn task_status(&self, id: &str) -> TaskStatus {
        self.state.status(id)
    }

    pub fn task_result(&self, id: &str) -> Option<TaskResult> {
        self.state.result(id)
    }

    pub fn running_tasks(&self) -> Vec<String> {
        self.state.running()
    }

    /// Highest number of tasks running at once during the last execution.
    pub fn peak_running(&self) -> usize {
        self.state.peak_running()
    }

    // -----------------------------------------------------------------------
    // Graph operations
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Result<(), WorkflowError> {
        self.registry.validate()
    }

    /// Ready ids for the given completed/failed sets. Propagates upstream
    /// failures into `failed` as a side effect.
    pub fn get_ready_tasks(
        &self,
        completed: &HashSet<String>,
        failed: &mut HashSet<String>,
    ) -> Vec<String> {
        select_ready(&self.registry, &self.state, completed, failed)
    }

    /// Dependency-depth waves, for dry runs.
    pub fn execution_plan(&self) -> Result<Vec<Vec<String>>, WorkflowError> {
        execution_plan(&self.registry)
    }

    /// Mermaid flowchart of the graph with current statuses.
    pub fn visualize(&self) -> String {
        self.visualize_as(GraphFormat::Mermaid)
    }

    pub fn visualize_as(&self, format: GraphFormat) -> String {
        render(&self.registry, &self.state, format)
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Run every registered task to a terminal state.
    ///
    /// Only validation failures are returned as errors; validation runs
    /// before any task state is touched. Each call resets run state, so
    /// re-running the same orchestrator starts from scratch.
    pub async fn execute(
        &mut self,
        name: &str,
        context: Value,
        fail_fast: bool,
    ) -> Result<WorkflowResult, WorkflowError> {
        self.validate()?;

        let workflow_id = Uuid::now_v7();
        let started_at = Utc::now();
        let clock = Instant::now();
        self.state.reset(self.registry.ids());

        let context = Arc::new(context);
        let gate = Arc::new(Semaphore::new(self.max_concurrent_tasks));
        let runner = TaskRunner::new(Arc::clone(&self.state), self.hooks.clone());
        let mut completed: HashSet<String> = HashSet::new();
        let mut failed: HashSet<String> = HashSet::new();

        tracing::info!(
            %workflow_id,
            workflow = %name,
            tasks = self.registry.len(),
            max_concurrent = self.max_concurrent_tasks,
            fail_fast,
            "workflow started"
        );

        let mut wave = 0usize;
        'waves: loop {
            let ready = select_ready(&self.registry, &self.state, &completed, &mut failed);
            if ready.is_empty() {
                let unresolved = self.unresolved(&completed, &failed);
                if !unresolved.is_empty() {
                    tracing::warn!(
                        %workflow_id,
                        unresolved = ?unresolved,
                        "deadlock: no ready tasks but work remains"
                    );
                }
                break;
            }

            wave += 1;
            tracing::debug!(%workflow_id, wave, tasks = ?ready, "launching wave");

            if fail_fast {
                for id in &ready {
                    let result = match self.runnable(id) {
                        Ok((spec, handler)) => {
                            let run = run_gated(
                                runner.clone(),
                                Arc::clone(&gate),
                                spec,
                                handler,
                                Arc::clone(&context),
                            );
                            match AssertUnwindSafe(run).catch_unwind().await {
                                Ok(result) => result,
                                Err(_) => self.runner_lost(id, "runner panicked"),
                            }
                        }
                        Err(result) => result,
                    };
                    if result.is_success() {
                        completed.insert(id.clone());
                    } else {
                        failed.insert(id.clone());
                        self.cancel_pending(&format!("cancelled: fail-fast after task '{id}' failed"));
                        break 'waves;
                    }
                }
            } else {
                let mut set = JoinSet::new();
                for id in &ready {
                    match self.runnable(id) {
                        Ok((spec, handler)) => {
                            let run = run_gated(
                                runner.clone(),
                                Arc::clone(&gate),
                                spec,
                                handler,
                                Arc::clone(&context),
                            );
                            let id = id.clone();
                            set.spawn(async move { (id, AssertUnwindSafe(run).catch_unwind().await) });
                        }
                        Err(result) => {
                            failed.insert(result.task_id);
                        }
                    }
                }
                while let Some(joined) = set.join_next().await {
                    match joined {
                        Ok((_, Ok(result))) if result.is_success() => {
                            completed.insert(result.task_id);
                        }
                        Ok((_, Ok(result))) => {
                            failed.insert(result.task_id);
                        }
                        Ok((id, Err(_))) => {
                            self.runner_lost(&id, "runner panicked");
                            failed.insert(id);
                        }
                        Err(e) => tracing::warn!(%workflow_id, error = %e, "wave join failed"),
                    }
                }
                // A join failure leaves no id behind; resolve those tasks here.
                for id in &ready {
                    if !completed.contains(id) && !failed.contains(id) {
                        self.runner_lost(id, "runner did not report a result");
                        failed.insert(id.clone());
                    }
                }
            }
        }

        self.cancel_pending("cancelled: dependencies never resolved");

        let tasks = self.state.results();
        let counts = WorkflowCounts::from_results(tasks.values());
        let status = WorkflowStatus::from_counts(&counts);
        let audit_hash = compute_audit_hash(&tasks).unwrap_or_else(|e| {
            tracing::warn!(%workflow_id, error = %e, "failed to compute audit hash");
            String::new()
        });

        let result = WorkflowResult {
            workflow_id,
            name: name.to_string(),
            status,
            tasks,
            started_at,
            completed_at: Utc::now(),
            duration_ms: clock.elapsed().as_millis() as u64,
            metadata: counts,
            audit_hash,
        };

        if let Err(e) = self.audit.append(&result).await {
            tracing::warn!(%workflow_id, error = %e, "audit write failed");
        }

        tracing::info!(
            %workflow_id,
            workflow = %name,
            %status,
            waves = wave,
            completed = counts.completed,
            failed = counts.failed,
            cancelled = counts.cancelled,
            duration_ms = result.duration_ms,
            "workflow finished"
        );

        self.hooks.workflow_completed(&result);
        Ok(result)
    }

    /// Look up what a ready task needs to run.
    ///
    /// A task that cannot run gets a recorded `Failed` result instead.
    fn runnable(&self, id: &str) -> Result<(Arc<TaskSpec>, BoxTaskHandler), TaskResult> {
        let Some(task) = self.registry.get(id) else {
            return Err(self.runner_lost(id, "task not registered"));
        };
        match task.handler() {
            Some(handler) => Ok((task.spec_arc(), handler.clone())),
            None => Err(self.runner_lost(id, "no handler bound")),
        }
    }

    /// Record a failed result for a task whose runner produced nothing.
    fn runner_lost(&self, id: &str, reason: &str) -> TaskResult {
        tracing::warn!(task_id = %id, %reason, "task runner lost");
        let result = TaskResult::synthetic(id, TaskStatus::Failed, format!("task runner failed: {reason}"));
        self.state.record(result.clone());
        result
    }

    /// Every registered task not yet resolved, in registration order.
    fn unresolved(&self, completed: &HashSet<String>, failed: &HashSet<String>) -> Vec<String> {
        self.registry
            .ids()
            .iter()
            .filter(|id| !completed.contains(*id) && !failed.contains(*id))
            .filter(|id| !self.state.status(id).is_terminal())
            .cloned()
            .collect()
    }

    /// Give every still-pending task a `Cancelled` result.
    fn cancel_pending(&self, reason: &str) {
        for id in self.registry.ids() {
            if self.state.status(id) == TaskStatus::Pending {
                self.state.record(TaskResult::synthetic(id, TaskStatus::Cancelled, reason));
            }
        }
    }
}

/// Wait for an admission permit, then run the task to a terminal result.
async fn run_gated(
    runner: TaskRunner,
    gate: Arc<Semaphore>,
    spec: Arc<TaskSpec>,
    handler: BoxTaskHandler,
    context: Arc<Value>,
) -> TaskResult {
    // The gate is never closed, so acquisition cannot fail mid-run.
    let _permit = gate.acquire_owned().await.ok();
    runner.run(spec, handler, context).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
