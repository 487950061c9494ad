//! `weave audit`: inspect the append-only audit log.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use serde_json::json;

use taskweave_core::workflow::audit::verify_audit_hash;
use taskweave_infra::audit::read_audit_log;
use taskweave_types::config::EngineConfig;

/// Audit log subcommands.
#[derive(Subcommand)]
pub enum AuditCommand {
    /// Recompute every record's hash and report tampered entries.
    Verify {
        /// Audit log path (defaults to the configured audit path).
        log: Option<PathBuf>,
    },
}

/// Handle an audit subcommand. Returns whether every record verified.
pub async fn handle_audit_command(
    cmd: AuditCommand,
    config: &EngineConfig,
    json: bool,
) -> Result<bool> {
    match cmd {
        AuditCommand::Verify { log } => {
            let path = log.unwrap_or_else(|| config.audit.path.clone());
            verify_log(&path, json).await
        }
    }
}

async fn verify_log(path: &Path, json: bool) -> Result<bool> {
    let records = read_audit_log(path)
        .await
        .with_context(|| format!("Failed to read audit log {}", path.display()))?;
    let checks: Vec<bool> = records.iter().map(verify_audit_hash).collect();
    let tampered = checks.iter().filter(|ok| !**ok).count();

    if json {
        let entries: Vec<_> = records
            .iter()
            .zip(&checks)
            .map(|(record, ok)| {
                json!({
                    "workflow_id": record.workflow_id,
                    "name": record.name,
                    "status": record.status,
                    "valid": ok,
                })
            })
            .collect();
        let out = json!({ "records": records.len(), "tampered": tampered, "entries": entries });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(tampered == 0);
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Run ID").fg(Color::Cyan),
            Cell::new("Workflow"),
            Cell::new("Status"),
            Cell::new("Completed"),
            Cell::new("Hash"),
        ]);
    for (record, ok) in records.iter().zip(&checks) {
        let hash_cell = if *ok {
            Cell::new("ok").fg(Color::Green)
        } else {
            Cell::new("TAMPERED").fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(record.workflow_id),
            Cell::new(&record.name),
            Cell::new(record.status),
            Cell::new(record.completed_at.format("%Y-%m-%d %H:%M:%S")),
            hash_cell,
        ]);
    }

    println!();
    println!("{table}");
    println!();
    if tampered == 0 {
        println!(
            "  {} {} records verified",
            style("*").green().bold(),
            records.len()
        );
    } else {
        println!(
            "  {} {} of {} records failed verification",
            style("x").red().bold(),
            tampered,
            records.len()
        );
    }
    println!();
    Ok(tampered == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::run::{RunOptions, run_workflow};

    #[tokio::test]
    async fn detects_edited_record() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("wf.yaml");
        std::fs::write(
            &file,
            "name: audited\ntasks:\n  - id: a\n    handler: echo\n    inputs:\n      word: original\n",
        )
        .unwrap();

        let mut config = EngineConfig::default();
        config.audit.enabled = true;
        config.audit.path = tmp.path().join("audit.jsonl");

        for _ in 0..2 {
            run_workflow(
                RunOptions {
                    file: &file,
                    fail_fast: false,
                    max_concurrent: None,
                    context: None,
                    json: false,
                    quiet: true,
                },
                &config,
            )
            .await
            .unwrap();
        }

        let cmd = || AuditCommand::Verify { log: None };
        assert!(handle_audit_command(cmd(), &config, true).await.unwrap());

        let log = std::fs::read_to_string(&config.audit.path).unwrap();
        let edited = log.replacen("original", "forged", 1);
        std::fs::write(&config.audit.path, edited).unwrap();
        assert!(!handle_audit_command(cmd(), &config, true).await.unwrap());
    }

    #[tokio::test]
    async fn missing_log_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let cmd = AuditCommand::Verify {
            log: Some(tmp.path().join("none.jsonl")),
        };
        assert!(handle_audit_command(cmd, &EngineConfig::default(), true).await.is_err());
    }
}
