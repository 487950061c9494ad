//! Task domain types: priority, lifecycle status, specification, and result.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default per-attempt timeout (5 minutes).
pub const DEFAULT_TASK_TIMEOUT_SECS: u64 = 300;

/// Default delay between retry attempts.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Launch priority of a task within a wave.
///
/// Variants are declared in ascending order so the derived `Ord` gives
/// `Low < Normal < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Normal => write!(f, "normal"),
            Priority::High => write!(f, "high"),
            Priority::Critical => write!(f, "critical"),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            other => Err(format!("invalid priority: '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a task within one execution.
///
/// ```text
/// Pending -> Running -> Completed | Failed
/// Pending -> Skipped | Failed     (upstream failure, handler never invoked)
/// Pending -> Cancelled            (fail-fast abort, handler never invoked)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
    Cancelled,
}

impl TaskStatus {
    /// Whether no further transition can happen in this execution.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Skipped | TaskStatus::Cancelled
        )
    }

    /// Whether dependents should treat this status as an upstream failure.
    pub fn is_failure(self) -> bool {
        matches!(self, TaskStatus::Failed | TaskStatus::Skipped)
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Skipped => write!(f, "skipped"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ---------------------------------------------------------------------------
// TaskSpec
// ---------------------------------------------------------------------------

/// Declarative description of a unit of work.
///
/// Holds everything about a task except its handler, which lives in the
/// engine crate. Built with chained setters:
///
/// ```
/// use std::time::Duration;
/// use taskweave_types::task::{Priority, TaskSpec};
///
/// let spec = TaskSpec::new("summarize", "Summarize feed")
///     .depends_on(["fetch"])
///     .priority(Priority::High)
///     .timeout(Duration::from_secs(30))
///     .max_retries(2);
/// assert_eq!(spec.dependencies, vec!["fetch".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSpec {
    /// Unique key within an orchestrator.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Free-form label (not enforced by the engine).
    pub role: Option<String>,
    /// Ids of tasks that must complete first, in declaration order.
    pub dependencies: Vec<String>,
    /// Static inputs handed to the handler.
    pub inputs: BTreeMap<String, Value>,
    pub priority: Priority,
    /// Per-attempt timeout.
    pub timeout: Duration,
    pub max_retries: u32,
    /// Sleep between a failed attempt and the next one.
    pub retry_delay: Duration,
    /// Mark as Skipped rather than Failed when an upstream task fails.
    pub skip_on_upstream_failure: bool,
    /// Opaque caller metadata.
    pub metadata: BTreeMap<String, Value>,
}

impl TaskSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: None,
            dependencies: Vec::new(),
            inputs: BTreeMap::new(),
            priority: Priority::Normal,
            timeout: Duration::from_secs(DEFAULT_TASK_TIMEOUT_SECS),
            max_retries: 0,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            skip_on_upstream_failure: false,
            metadata: BTreeMap::new(),
        }
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(deps.into_iter().map(Into::into));
        self
    }

    pub fn input(mut self, key: impl Into<String>, value: Value) -> Self {
        self.inputs.insert(key.into(), value);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn skip_on_upstream_failure(mut self, skip: bool) -> Self {
        self.skip_on_upstream_failure = skip;
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Name for display, falling back to the id when the name is blank.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

// ---------------------------------------------------------------------------
// TaskResult
// ---------------------------------------------------------------------------

/// Immutable outcome of one task in one execution.
///
/// `error` is present exactly when `status` is not `Completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub status: TaskStatus,
    /// Handler-defined output (`null` when the handler never produced one).
    #[serde(default)]
    pub output: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Retry attempts consumed after the first try.
    pub retries: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl TaskResult {
    /// Result of a handler invocation that succeeded.
    pub fn completed(
        task_id: impl Into<String>,
        output: Value,
        started_at: DateTime<Utc>,
        duration: Duration,
        retries: u32,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Completed,
            output,
            error: None,
            started_at,
            completed_at: Utc::now(),
            duration_ms: duration.as_millis() as u64,
            retries,
            metadata: BTreeMap::new(),
        }
    }

    /// Result of a task whose attempts were all exhausted.
    pub fn failed(
        task_id: impl Into<String>,
        error: impl Into<String>,
        started_at: DateTime<Utc>,
        duration: Duration,
        retries: u32,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Failed,
            output: Value::Null,
            error: Some(error.into()),
            started_at,
            completed_at: Utc::now(),
            duration_ms: duration.as_millis() as u64,
            retries,
            metadata: BTreeMap::new(),
        }
    }

    /// Result for a task whose handler was never invoked (upstream failure,
    /// cancellation).
    pub fn synthetic(task_id: impl Into<String>, status: TaskStatus, reason: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            task_id: task_id.into(),
            status,
            output: Value::Null,
            error: Some(reason.into()),
            started_at: now,
            completed_at: now,
            duration_ms: 0,
            retries: 0,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn priority_orders_low_to_critical() {
        assert!(Priority::Low < Priority::Normal);
        assert!(Priority::Normal < Priority::High);
        assert!(Priority::High < Priority::Critical);
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn priority_from_str_is_case_insensitive() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Skipped.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
    }

    #[test]
    fn skipped_counts_as_failure_for_propagation() {
        assert!(TaskStatus::Skipped.is_failure());
        assert!(TaskStatus::Failed.is_failure());
        assert!(!TaskStatus::Cancelled.is_failure());
        assert!(!TaskStatus::Completed.is_failure());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&TaskStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
        assert_eq!(TaskStatus::Running.to_string(), "running");
    }

    #[test]
    fn spec_builder_sets_fields() {
        let spec = TaskSpec::new("b", "Build")
            .role("builder")
            .depends_on(["a", "c"])
            .input("target", json!("release"))
            .priority(Priority::Critical)
            .timeout(Duration::from_secs(5))
            .max_retries(3)
            .retry_delay(Duration::from_millis(10))
            .skip_on_upstream_failure(true)
            .metadata("owner", json!("ci"));

        assert_eq!(spec.role.as_deref(), Some("builder"));
        assert_eq!(spec.dependencies, vec!["a", "c"]);
        assert_eq!(spec.inputs["target"], json!("release"));
        assert_eq!(spec.priority, Priority::Critical);
        assert_eq!(spec.timeout, Duration::from_secs(5));
        assert_eq!(spec.max_retries, 3);
        assert_eq!(spec.retry_delay, Duration::from_millis(10));
        assert!(spec.skip_on_upstream_failure);
        assert_eq!(spec.metadata["owner"], json!("ci"));
    }

    #[test]
    fn spec_defaults() {
        let spec = TaskSpec::new("a", "");
        assert_eq!(spec.timeout, Duration::from_secs(DEFAULT_TASK_TIMEOUT_SECS));
        assert_eq!(spec.max_retries, 0);
        assert!(!spec.skip_on_upstream_failure);
        assert_eq!(spec.display_name(), "a");
    }

    #[test]
    fn failed_result_carries_error() {
        let result = TaskResult::failed("x", "boom", Utc::now(), Duration::from_millis(1500), 2);
        assert_eq!(result.status, TaskStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert_eq!(result.duration_ms, 1500);
        assert_eq!(result.retries, 2);
        assert!(!result.is_success());
    }

    #[test]
    fn completed_result_has_no_error() {
        let result = TaskResult::completed("x", json!({"n": 1}), Utc::now(), Duration::ZERO, 0);
        assert!(result.is_success());
        assert!(result.error.is_none());
        assert_eq!(result.output["n"], 1);
    }

    #[test]
    fn synthetic_result_is_instant() {
        let result = TaskResult::synthetic("c", TaskStatus::Skipped, "upstream failed");
        assert_eq!(result.duration_ms, 0);
        assert_eq!(result.started_at, result.completed_at);
        assert_eq!(result.output, Value::Null);
    }
}
