//! Engine configuration types.
//!
//! `EngineConfig` represents the `config.toml` that controls the default
//! concurrency bound, per-task defaults, audit logging, and telemetry.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::task::{DEFAULT_RETRY_DELAY_MS, DEFAULT_TASK_TIMEOUT_SECS};

/// Top-level engine configuration. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of tasks running at once.
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,

    /// Per-attempt timeout for tasks that do not set one.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    /// Retry delay for tasks that do not set one.
    #[serde(default = "default_retry_delay_ms")]
    pub default_retry_delay_ms: u64,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_max_concurrent_tasks() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TASK_TIMEOUT_SECS
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: default_max_concurrent_tasks(),
            default_timeout_secs: default_timeout_secs(),
            default_retry_delay_ms: default_retry_delay_ms(),
            audit: AuditConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Append-only audit log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub enabled: bool,

    /// JSONL file receiving one workflow result per execution.
    #[serde(default = "default_audit_path")]
    pub path: PathBuf,
}

fn default_audit_path() -> PathBuf {
    PathBuf::from("taskweave-audit.jsonl")
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_audit_path(),
        }
    }
}

/// Logging and trace export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Export spans through OpenTelemetry (stdout exporter).
    #[serde(default)]
    pub otel: bool,

    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otel: false,
            log_filter: default_log_filter(),
        }
    }
}
