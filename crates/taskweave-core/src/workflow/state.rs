//! Per-execution task state shared between the control loop and runners.
//!
//! Runners execute concurrently on the tokio runtime, so every write to the
//! status map, result map, and running set goes through one mutex. The lock
//! is never held across an `.await`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use taskweave_types::task::{TaskResult, TaskStatus};

#[derive(Debug, Default)]
struct Inner {
    statuses: HashMap<String, TaskStatus>,
    results: HashMap<String, TaskResult>,
    running: HashSet<String>,
    peak_running: usize,
}

/// Status, result, and running-set tracking for the current execution.
#[derive(Debug, Default)]
pub struct RunState {
    inner: Mutex<Inner>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Every critical section is a handful of map inserts; a poisoned
        // guard still holds consistent maps.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put every given task back to `Pending` with no result.
    pub fn reset<'a>(&self, ids: impl IntoIterator<Item = &'a String>) {
        let mut inner = self.lock();
        inner.statuses.clear();
        inner.results.clear();
        inner.running.clear();
        inner.peak_running = 0;
        for id in ids {
            inner.statuses.insert(id.clone(), TaskStatus::Pending);
        }
    }

    /// Forget every task.
    pub fn clear(&self) {
        let mut inner = self.lock();
        *inner = Inner::default();
    }

    /// Current status; unknown tasks read as `Pending`.
    pub fn status(&self, id: &str) -> TaskStatus {
        self.lock().statuses.get(id).copied().unwrap_or_default()
    }

    pub fn result(&self, id: &str) -> Option<TaskResult> {
        self.lock().results.get(id).cloned()
    }

    /// Mark an attempt as in flight.
    pub fn mark_running(&self, id: &str) {
        let mut inner = self.lock();
        inner.statuses.insert(id.to_string(), TaskStatus::Running);
        inner.running.insert(id.to_string());
        inner.peak_running = inner.peak_running.max(inner.running.len());
    }

    /// Remove a task from the running set after an attempt ends.
    ///
    /// The status stays `Running` until a result is recorded so retries in
    /// backoff still read as in progress.
    pub fn mark_idle(&self, id: &str) {
        self.lock().running.remove(id);
    }

    /// Store a terminal result and its status.
    pub fn record(&self, result: TaskResult) {
        let mut inner = self.lock();
        inner.running.remove(&result.task_id);
        inner.statuses.insert(result.task_id.clone(), result.status);
        inner.results.insert(result.task_id.clone(), result);
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.lock().running.contains(id)
    }

    /// Ids with an attempt currently in flight, sorted.
    pub fn running(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().running.iter().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Highest number of simultaneously running tasks since the last reset.
    pub fn peak_running(&self) -> usize {
        self.lock().peak_running
    }

    /// All recorded results keyed by task id.
    pub fn results(&self) -> BTreeMap<String, TaskResult> {
        self.lock()
            .results
            .iter()
            .map(|(id, result)| (id.clone(), result.clone()))
            .collect()
    }
}
