//! Deterministic result hashing and the audit sink port.
//!
//! The audit hash is SHA-256 over a canonical JSON encoding of the per-task
//! result map: object keys sorted at every depth, compact separators. The
//! same results always produce the same bytes and therefore the same hash.
//! The JSONL sink adapter lives in taskweave-infra.

use std::collections::BTreeMap;
use std::future::Future;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use taskweave_types::task::TaskResult;
use taskweave_types::workflow::WorkflowResult;

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Recursively rebuild objects with sorted keys.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::with_capacity(entries.len());
            for (key, value) in entries {
                sorted.insert(key, canonicalize(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Canonical bytes hashed by [`compute_audit_hash`].
pub fn canonical_json(results: &BTreeMap<String, TaskResult>) -> Result<String, serde_json::Error> {
    let value = canonicalize(serde_json::to_value(results)?);
    serde_json::to_string(&value)
}

/// Lowercase hex SHA-256 of the canonical encoding of `results`.
pub fn compute_audit_hash(results: &BTreeMap<String, TaskResult>) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(results)?;
    Ok(format!("{:x}", Sha256::digest(canonical.as_bytes())))
}

/// Recompute the hash over `result.tasks` and compare it to `audit_hash`.
pub fn verify_audit_hash(result: &WorkflowResult) -> bool {
    match compute_audit_hash(&result.tasks) {
        Ok(hash) => !result.audit_hash.is_empty() && hash == result.audit_hash,
        Err(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Sink port
// ---------------------------------------------------------------------------

/// Errors from writing an audit record. Never affect the workflow outcome.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Append-only destination for finished workflow results.
pub trait AuditSink: Send + Sync {
    fn append(&self, result: &WorkflowResult) -> impl Future<Output = Result<(), AuditError>> + Send;
}

/// Sink that drops every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuditSink;

impl AuditSink for NoAuditSink {
    async fn append(&self, _result: &WorkflowResult) -> Result<(), AuditError> {
        Ok(())
    }
}

/// A disabled sink (`None`) is a no-op.
impl<S: AuditSink> AuditSink for Option<S> {
    async fn append(&self, result: &WorkflowResult) -> Result<(), AuditError> {
        match self {
            Some(sink) => sink.append(result).await,
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::time::Duration;
    use taskweave_types::task::TaskStatus;
    use taskweave_types::workflow::{WorkflowCounts, WorkflowStatus};

    fn fixed_results() -> BTreeMap<String, TaskResult> {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let mut a = TaskResult::completed("a", json!({"z": 1, "a": [ {"y": 2, "b": 3} ]}), at, Duration::from_millis(7), 0);
        a.completed_at = at;
        let mut b = TaskResult::failed("b", "boom", at, Duration::from_millis(3), 2);
        b.completed_at = at;
        BTreeMap::from([("a".to_string(), a), ("b".to_string(), b)])
    }

    #[test]
    fn canonical_form_sorts_nested_keys() {
        let canonical = canonical_json(&fixed_results()).unwrap();
        assert!(canonical.contains(r#""output":{"a":[{"b":3,"y":2}],"z":1}"#));
        assert!(!canonical.contains(": "));
    }

    #[test]
    fn hash_is_deterministic_hex() {
        let first = compute_audit_hash(&fixed_results()).unwrap();
        let second = compute_audit_hash(&fixed_results()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn any_field_change_changes_hash() {
        let base = compute_audit_hash(&fixed_results()).unwrap();

        let mut changed = fixed_results();
        changed.get_mut("a").unwrap().output = json!({"z": 2});
        assert_ne!(base, compute_audit_hash(&changed).unwrap());

        let mut changed = fixed_results();
        changed.get_mut("b").unwrap().status = TaskStatus::Skipped;
        assert_ne!(base, compute_audit_hash(&changed).unwrap());
    }

    #[test]
    fn empty_map_hashes() {
        let hash = compute_audit_hash(&BTreeMap::new()).unwrap();
        // SHA-256 of "{}"
        assert_eq!(hash, "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a");
    }

    #[test]
    fn verify_detects_tampering() {
        let tasks = fixed_results();
        let at = Utc::now();
        let mut result = WorkflowResult {
            workflow_id: uuid::Uuid::now_v7(),
            name: "wf".into(),
            status: WorkflowStatus::Partial,
            metadata: WorkflowCounts::from_results(tasks.values()),
            audit_hash: compute_audit_hash(&tasks).unwrap(),
            tasks,
            started_at: at,
            completed_at: at,
            duration_ms: 0,
        };
        assert!(verify_audit_hash(&result));

        result.tasks.get_mut("b").unwrap().error = Some("edited".into());
        assert!(!verify_audit_hash(&result));
    }

    #[tokio::test]
    async fn none_sink_is_noop() {
        let sink: Option<NoAuditSink> = None;
        let at = Utc::now();
        let result = WorkflowResult {
            workflow_id: uuid::Uuid::now_v7(),
            name: "wf".into(),
            status: WorkflowStatus::Completed,
            tasks: BTreeMap::new(),
            started_at: at,
            completed_at: at,
            duration_ms: 0,
            metadata: WorkflowCounts::default(),
            audit_hash: String::new(),
        };
        assert!(sink.append(&result).await.is_ok());
        assert!(NoAuditSink.append(&result).await.is_ok());
    }
}
