//! Task registry and validator.
//!
//! Tasks are stored in an id-keyed map plus a registration-order list. The
//! graph is never materialized as object references: dependency edges are
//! just ids looked up in the map.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use taskweave_types::task::TaskSpec;

use crate::handler::{BoxTaskHandler, TaskHandler};

use super::definition::WorkflowError;

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A registered unit of work: its spec plus the handler that runs it.
///
/// Runtime state (status, result) is tracked per execution by
/// [`RunState`](super::state::RunState), not on the task itself.
#[derive(Debug, Clone)]
pub struct Task {
    spec: Arc<TaskSpec>,
    handler: Option<BoxTaskHandler>,
}

impl Task {
    /// A task without a handler. `validate()` rejects it until one is set.
    pub fn new(spec: TaskSpec) -> Self {
        Self {
            spec: Arc::new(spec),
            handler: None,
        }
    }

    pub fn with_handler<H: TaskHandler + 'static>(self, handler: H) -> Self {
        self.with_boxed_handler(BoxTaskHandler::new(handler))
    }

    pub fn with_boxed_handler(mut self, handler: BoxTaskHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    pub(crate) fn spec_arc(&self) -> Arc<TaskSpec> {
        Arc::clone(&self.spec)
    }

    pub fn handler(&self) -> Option<&BoxTaskHandler> {
        self.handler.as_ref()
    }
}

// ---------------------------------------------------------------------------
// TaskRegistry
// ---------------------------------------------------------------------------

/// Task map that remembers registration order.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, Task>,
    order: Vec<String>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task, replacing any task with the same id.
    ///
    /// A replaced task keeps its original registration slot. Returns the
    /// previous task, if any.
    pub fn insert(&mut self, task: Task) -> Option<Task> {
        let id = task.id().to_string();
        let previous = self.tasks.insert(id.clone(), task);
        if previous.is_none() {
            self.order.push(id);
        }
        previous
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task ids in registration order.
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    /// Tasks in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
        self.order.clear();
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Check referential integrity, acyclicity, and handler completeness, in
    /// that order. Read-only and idempotent.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        for task in self.iter() {
            for dep in &task.spec().dependencies {
                if !self.contains(dep) {
                    return Err(WorkflowError::UnknownDependency {
                        task_id: task.id().to_string(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        if let Some((task_id, path)) = self.detect_cycle() {
            return Err(WorkflowError::CycleDetected { task_id, path });
        }

        for task in self.iter() {
            if task.handler().is_none() {
                return Err(WorkflowError::MissingHandler(task.id().to_string()));
            }
        }

        Ok(())
    }

    /// Depth-first search with a visited set and a recursion stack.
    ///
    /// Returns the task that closed the cycle and the cycle path
    /// (`a -> b -> a`).
    fn detect_cycle(&self) -> Option<(String, String)> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = Vec::new();

        for id in &self.order {
            if !visited.contains(id.as_str()) {
                if let Some(cycle) = self.dfs_cycle(id, &mut visited, &mut stack) {
                    let closing = cycle.last().map(|s| s.to_string()).unwrap_or_default();
                    return Some((closing, cycle.join(" -> ")));
                }
            }
        }

        None
    }

    fn dfs_cycle<'a>(
        &'a self,
        node: &'a str,
        visited: &mut HashSet<&'a str>,
        stack: &mut Vec<&'a str>,
    ) -> Option<Vec<&'a str>> {
        visited.insert(node);
        stack.push(node);

        if let Some(task) = self.tasks.get(node) {
            for dep in &task.spec().dependencies {
                let dep = dep.as_str();
                if let Some(pos) = stack.iter().position(|n| *n == dep) {
                    let mut cycle = stack[pos..].to_vec();
                    cycle.push(dep);
                    return Some(cycle);
                }
                if !visited.contains(dep) {
                    if let Some(cycle) = self.dfs_cycle(dep, visited, stack) {
                        return Some(cycle);
                    }
                }
            }
        }

        stack.pop();
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use serde_json::json;

    fn task(id: &str, deps: Vec<&str>) -> Task {
        Task::new(TaskSpec::new(id, id).depends_on(deps))
            .with_handler(handler_fn(|_, _, _| async { Ok(json!(null)) }))
    }

    fn registry(tasks: Vec<Task>) -> TaskRegistry {
        let mut registry = TaskRegistry::new();
        for t in tasks {
            registry.insert(t);
        }
        registry
    }

    #[test]
    fn valid_diamond_passes() {
        let reg = registry(vec![
            task("a", vec![]),
            task("b", vec!["a"]),
            task("c", vec!["a"]),
            task("d", vec!["b", "c"]),
        ]);
        assert!(reg.validate().is_ok());
        // Idempotent
        assert!(reg.validate().is_ok());
    }

    #[test]
    fn empty_registry_is_valid() {
        assert!(TaskRegistry::new().validate().is_ok());
    }

    #[test]
    fn unknown_dependency_names_task_and_dep() {
        let reg = registry(vec![task("a", vec![]), task("b", vec!["ghost"])]);
        match reg.validate().unwrap_err() {
            WorkflowError::UnknownDependency { task_id, dependency } => {
                assert_eq!(task_id, "b");
                assert_eq!(dependency, "ghost");
            }
            other => panic!("expected UnknownDependency, got {other:?}"),
        }
    }

    #[test]
    fn three_node_cycle_detected() {
        let reg = registry(vec![
            task("a", vec!["c"]),
            task("b", vec!["a"]),
            task("c", vec!["b"]),
        ]);
        let err = reg.validate().unwrap_err();
        match &err {
            WorkflowError::CycleDetected { task_id, path } => {
                assert_eq!(task_id, "a");
                assert_eq!(path, "a -> c -> b -> a");
            }
            other => panic!("expected CycleDetected, got {other:?}"),
        }
        assert!(err.to_string().contains("cycle detected"));
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let reg = registry(vec![task("loop", vec!["loop"])]);
        assert!(matches!(
            reg.validate(),
            Err(WorkflowError::CycleDetected { .. })
        ));
    }

    #[test]
    fn missing_handler_names_task() {
        let reg = registry(vec![
            task("a", vec![]),
            Task::new(TaskSpec::new("bare", "Bare").depends_on(["a"])),
        ]);
        match reg.validate().unwrap_err() {
            WorkflowError::MissingHandler(id) => assert_eq!(id, "bare"),
            other => panic!("expected MissingHandler, got {other:?}"),
        }
    }

    #[test]
    fn referential_check_runs_before_cycle_check() {
        let reg = registry(vec![task("a", vec!["b"]), task("b", vec!["a", "nope"])]);
        assert!(matches!(
            reg.validate(),
            Err(WorkflowError::UnknownDependency { .. })
        ));
    }

    #[test]
    fn overwrite_keeps_registration_slot() {
        let mut reg = registry(vec![task("a", vec![]), task("b", vec![]), task("c", vec![])]);
        let previous = reg.insert(task("a", vec!["c"]));
        assert!(previous.is_some());
        assert_eq!(reg.ids(), &["a", "b", "c"]);
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.get("a").unwrap().spec().dependencies, vec!["c"]);
    }

    #[test]
    fn clear_empties_everything() {
        let mut reg = registry(vec![task("a", vec![])]);
        reg.clear();
        assert!(reg.is_empty());
        assert!(reg.ids().is_empty());
    }
}
