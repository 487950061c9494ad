//! Workflow-level types: execution results and the definition-file shape.
//!
//! `WorkflowResult` is produced once per execution and is the record written
//! to the audit log. `WorkflowDefinition` / `TaskDefinition` mirror the YAML
//! files accepted by the `weave` CLI.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::task::{Priority, TaskResult, TaskStatus};

// ---------------------------------------------------------------------------
// Workflow status
// ---------------------------------------------------------------------------

/// Terminal status of a whole execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Every task completed (or there were no tasks).
    Completed,
    /// Some tasks completed, others failed, were skipped, or were cancelled.
    Partial,
    /// Nothing completed and at least one task did not.
    Failed,
}

impl WorkflowStatus {
    /// Derive the workflow status from its counts.
    pub fn from_counts(counts: &WorkflowCounts) -> Self {
        let unsuccessful = counts.failed + counts.cancelled;
        if unsuccessful == 0 {
            WorkflowStatus::Completed
        } else if counts.completed == 0 {
            WorkflowStatus::Failed
        } else {
            WorkflowStatus::Partial
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowStatus::Completed => write!(f, "completed"),
            WorkflowStatus::Partial => write!(f, "partial"),
            WorkflowStatus::Failed => write!(f, "failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Counts
// ---------------------------------------------------------------------------

/// Per-status tallies for a workflow result.
///
/// `failed` counts everything in the failure set, which includes skipped
/// tasks; `skipped` is the subset that was skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowCounts {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: usize,
}

impl WorkflowCounts {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a TaskResult>) -> Self {
        let mut counts = WorkflowCounts::default();
        for result in results {
            counts.total += 1;
            if result.status.is_failure() {
                counts.failed += 1;
            }
            match result.status {
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Skipped => counts.skipped += 1,
                TaskStatus::Cancelled => counts.cancelled += 1,
                TaskStatus::Failed | TaskStatus::Pending | TaskStatus::Running => {}
            }
        }
        counts
    }
}

// ---------------------------------------------------------------------------
// Workflow result
// ---------------------------------------------------------------------------

/// Outcome of one `execute()` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    /// UUIDv7 allocated per execution.
    pub workflow_id: Uuid,
    pub name: String,
    pub status: WorkflowStatus,
    /// One entry per registered task, keyed by task id.
    pub tasks: BTreeMap<String, TaskResult>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub metadata: WorkflowCounts,
    /// Lowercase hex SHA-256 over `tasks`.
    pub audit_hash: String,
}

// ---------------------------------------------------------------------------
// Definition files
// ---------------------------------------------------------------------------

/// A workflow as written in a YAML definition file.
///
/// ```yaml
/// name: nightly-report
/// max_concurrent_tasks: 2
/// tasks:
///   - id: fetch
///     handler: shell
///     inputs:
///       command: "curl -s https://example.com/feed"
///   - id: summarize
///     handler: echo
///     depends_on: [fetch]
///     priority: high
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Overrides the configured concurrency bound for this workflow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_tasks: Option<usize>,
    /// Abort remaining work on the first task failure.
    #[serde(default)]
    pub fail_fast: bool,
    /// Read-only context handed to every handler.
    #[serde(default)]
    pub context: Value,
    pub tasks: Vec<TaskDefinition>,
}

/// A single task entry in a definition file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Name of a registered handler (e.g. `echo`, `shell`).
    pub handler: String,
    #[serde(default, alias = "dependencies")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, Value>,
    #[serde(default)]
    pub priority: Priority,
    /// Per-attempt timeout; falls back to the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_retries: u32,
    /// Delay between attempts; falls back to the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,
    #[serde(default)]
    pub skip_on_upstream_failure: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
