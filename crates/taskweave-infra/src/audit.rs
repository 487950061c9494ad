//! Append-only JSONL audit log.
//!
//! One compact JSON `WorkflowResult` per line. The file is opened in append
//! mode for every record, so concurrent processes never truncate each
//! other's entries.

use std::path::{Path, PathBuf};

use taskweave_core::workflow::audit::{AuditError, AuditSink};
use taskweave_types::config::AuditConfig;
use taskweave_types::workflow::WorkflowResult;
use tokio::io::AsyncWriteExt;

/// Audit sink writing to a JSONL file.
#[derive(Debug, Clone)]
pub struct JsonlAuditSink {
    path: PathBuf,
}

impl JsonlAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `None` when audit logging is disabled or the path is blank.
    pub fn from_config(config: &AuditConfig) -> Option<Self> {
        if !config.enabled || config.path.as_os_str().is_empty() {
            return None;
        }
        Some(Self::new(&config.path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonlAuditSink {
    async fn append(&self, result: &WorkflowResult) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(result)?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        tracing::debug!(
            workflow_id = %result.workflow_id,
            path = %self.path.display(),
            "audit record appended"
        );
        Ok(())
    }
}

/// Read every record from an audit log, in append order.
///
/// Blank lines are ignored; a malformed line is an error naming its line
/// number.
pub async fn read_audit_log(path: &Path) -> Result<Vec<WorkflowResult>, AuditError> {
    let content = tokio::fs::read_to_string(path).await?;
    let mut records = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str::<WorkflowResult>(line).map_err(|e| {
            AuditError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("line {}: {e}", index + 1),
            ))
        })?;
        records.push(record);
    }
    Ok(records)
}
