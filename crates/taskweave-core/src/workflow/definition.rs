//! Workflow definition files: parsing, structural checks, orchestrator assembly.
//!
//! A definition file is YAML describing a workflow's tasks and the name of
//! the handler each task runs. Handler names are resolved against a
//! [`HandlerRegistry`] when the orchestrator is built.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use taskweave_types::config::EngineConfig;
use taskweave_types::task::TaskSpec;
use taskweave_types::workflow::{TaskDefinition, WorkflowDefinition};
use thiserror::Error;

use crate::handler::HandlerRegistry;

use super::orchestrator::Orchestrator;
use super::registry::Task;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors raised while loading or validating a workflow.
///
/// `execute()` only ever returns the graph variants; the rest come from
/// definition loading.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// YAML parse failure.
    #[error("parse error: {0}")]
    ParseError(String),

    /// Structural validation failure in a definition file.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Filesystem I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A task depends on an id that is not registered.
    #[error("task '{task_id}' depends on unknown task '{dependency}'")]
    UnknownDependency { task_id: String, dependency: String },

    /// The dependency graph contains a cycle.
    #[error("cycle detected at task '{task_id}': {path}")]
    CycleDetected { task_id: String, path: String },

    /// A task has no handler bound.
    #[error("task '{0}' has no handler")]
    MissingHandler(String),
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a YAML string into a structurally valid `WorkflowDefinition`.
pub fn parse_workflow_yaml(yaml: &str) -> Result<WorkflowDefinition, WorkflowError> {
    let def: WorkflowDefinition =
        serde_yaml_ng::from_str(yaml).map_err(|e| WorkflowError::ParseError(e.to_string()))?;
    validate_definition(&def)?;
    Ok(def)
}

/// Load a workflow definition from a YAML file.
pub fn load_workflow_file(path: &Path) -> Result<WorkflowDefinition, WorkflowError> {
    let content = std::fs::read_to_string(path)?;
    parse_workflow_yaml(&content)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Structural checks that do not need handlers or the dependency graph.
///
/// Checks:
/// - Name is non-empty and contains only alphanumerics, hyphens, underscores
/// - At least one task exists
/// - All task ids are unique and non-empty
/// - `max_concurrent_tasks` >= 1 if set
///
/// Dependency references and cycles are checked later by
/// [`TaskRegistry::validate`](super::registry::TaskRegistry::validate).
pub fn validate_definition(def: &WorkflowDefinition) -> Result<(), WorkflowError> {
    if def.name.is_empty() {
        return Err(WorkflowError::ValidationError(
            "workflow name must not be empty".to_string(),
        ));
    }
    if !def
        .name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(WorkflowError::ValidationError(format!(
            "workflow name '{}' contains invalid characters (only alphanumeric, '-' and '_' allowed)",
            def.name
        )));
    }

    if def.tasks.is_empty() {
        return Err(WorkflowError::ValidationError(
            "workflow must have at least one task".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for task in &def.tasks {
        if task.id.trim().is_empty() {
            return Err(WorkflowError::ValidationError(
                "task id must not be empty".to_string(),
            ));
        }
        if !seen.insert(task.id.as_str()) {
            return Err(WorkflowError::ValidationError(format!(
                "duplicate task ID: '{}'",
                task.id
            )));
        }
    }

    if def.max_concurrent_tasks == Some(0) {
        return Err(WorkflowError::ValidationError(
            "max_concurrent_tasks must be at least 1".to_string(),
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Map a task definition onto a spec, filling unset durations from config.
pub fn task_spec_from_definition(def: &TaskDefinition, config: &EngineConfig) -> TaskSpec {
    let timeout = Duration::from_secs(def.timeout_secs.unwrap_or(config.default_timeout_secs));
    let retry_delay =
        Duration::from_millis(def.retry_delay_ms.unwrap_or(config.default_retry_delay_ms));

    let mut spec = TaskSpec::new(def.id.clone(), def.name.clone().unwrap_or_else(|| def.id.clone()))
        .depends_on(def.depends_on.iter().cloned())
        .priority(def.priority)
        .timeout(timeout)
        .max_retries(def.max_retries)
        .retry_delay(retry_delay)
        .skip_on_upstream_failure(def.skip_on_upstream_failure);
    spec.role = def.role.clone();
    spec.inputs = def.inputs.clone();
    spec.metadata = def.metadata.clone();
    spec
}

/// Build an orchestrator from a definition, binding handlers by name.
///
/// A task whose handler name is not registered is added without a handler,
/// so `validate()` reports it as `MissingHandler` before anything runs.
/// Concurrency comes from the definition, falling back to the config.
pub fn build_orchestrator(
    def: &WorkflowDefinition,
    handlers: &HandlerRegistry,
    config: &EngineConfig,
) -> Result<Orchestrator, WorkflowError> {
    validate_definition(def)?;

    let max_concurrent = def
        .max_concurrent_tasks
        .unwrap_or(config.max_concurrent_tasks);
    let mut orchestrator = Orchestrator::new(max_concurrent);

    for task_def in &def.tasks {
        let mut task = Task::new(task_spec_from_definition(task_def, config));
        match handlers.get(&task_def.handler) {
            Some(handler) => task = task.with_boxed_handler(handler.clone()),
            None => tracing::warn!(
                task_id = %task_def.id,
                handler = %task_def.handler,
                "unknown handler name"
            ),
        }
        orchestrator.add_task(task);
    }

    tracing::debug!(
        workflow = %def.name,
        tasks = def.tasks.len(),
        max_concurrent,
        "built orchestrator from definition"
    );
    Ok(orchestrator)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
