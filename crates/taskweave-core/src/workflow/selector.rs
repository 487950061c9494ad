//! Ready-set computation and upstream failure propagation.

use std::collections::HashSet;

use taskweave_types::task::{TaskResult, TaskStatus};

use super::registry::TaskRegistry;
use super::state::RunState;

/// Whether a task still needs scheduling in this execution.
fn is_unresolved(
    id: &str,
    state: &RunState,
    completed: &HashSet<String>,
    failed: &HashSet<String>,
) -> bool {
    !completed.contains(id)
        && !failed.contains(id)
        && !state.is_running(id)
        && state.status(id) == TaskStatus::Pending
}

/// Compute the tasks that can launch now.
///
/// First propagates upstream failures: any pending task with a dependency in
/// `failed` is resolved as `Skipped` (when `skip_on_upstream_failure`) or
/// `Failed`, with a synthetic result naming the failed upstream ids. Its
/// handler is never invoked and its id joins `failed`. Propagation repeats
/// until nothing changes, so a whole failed chain resolves in one call.
///
/// Then returns every pending task whose dependencies are all in
/// `completed`, ordered by descending priority with ties in registration
/// order.
pub fn select_ready(
    registry: &TaskRegistry,
    state: &RunState,
    completed: &HashSet<String>,
    failed: &mut HashSet<String>,
) -> Vec<String> {
    loop {
        let mut changed = false;
        for task in registry.iter() {
            let id = task.id();
            if !is_unresolved(id, state, completed, failed) {
                continue;
            }

            let failed_deps: Vec<&str> = task
                .spec()
                .dependencies
                .iter()
                .filter(|dep| failed.contains(dep.as_str()))
                .map(String::as_str)
                .collect();
            if failed_deps.is_empty() {
                continue;
            }

            let status = if task.spec().skip_on_upstream_failure {
                TaskStatus::Skipped
            } else {
                TaskStatus::Failed
            };
            let reason = format!("upstream task(s) failed: {}", failed_deps.join(", "));
            tracing::debug!(task_id = %id, %status, %reason, "propagating upstream failure");

            state.record(TaskResult::synthetic(id, status, reason));
            failed.insert(id.to_string());
            changed = true;
        }
        if !changed {
            break;
        }
    }

    let mut ready: Vec<(usize, String)> = registry
        .iter()
        .enumerate()
        .filter(|(_, task)| is_unresolved(task.id(), state, completed, failed))
        .filter(|(_, task)| {
            task.spec()
                .dependencies
                .iter()
                .all(|dep| completed.contains(dep))
        })
        .map(|(position, task)| (position, task.id().to_string()))
        .collect();

    ready.sort_by_key(|(position, id)| {
        let priority = registry.get(id).map(|t| t.spec().priority).unwrap_or_default();
        (std::cmp::Reverse(priority), *position)
    });
    ready.into_iter().map(|(_, id)| id).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
