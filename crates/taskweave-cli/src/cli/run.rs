//! `weave run`: execute a workflow file with the built-in handlers.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;

use taskweave_infra::audit::JsonlAuditSink;
use taskweave_infra::config::resolve_max_concurrent;
use taskweave_types::config::EngineConfig;
use taskweave_types::task::TaskStatus;
use taskweave_types::workflow::{WorkflowResult, WorkflowStatus};

use super::load_orchestrator;

/// Options for one `weave run` invocation.
pub struct RunOptions<'a> {
    pub file: &'a Path,
    pub fail_fast: bool,
    pub max_concurrent: Option<usize>,
    pub context: Option<&'a str>,
    pub json: bool,
    pub quiet: bool,
}

/// Parse `--context`, which must be a JSON object.
pub fn parse_context(raw: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(raw).context("--context is not valid JSON")?;
    if !value.is_object() {
        anyhow::bail!("--context must be a JSON object");
    }
    Ok(value)
}

/// Run the workflow and print the outcome. Returns the workflow status.
pub async fn run_workflow(opts: RunOptions<'_>, config: &EngineConfig) -> Result<WorkflowStatus> {
    let (def, mut orchestrator) = load_orchestrator(opts.file, config)?;
    orchestrator.set_max_concurrent_tasks(resolve_max_concurrent(
        config,
        def.max_concurrent_tasks,
        opts.max_concurrent,
    ));

    let context = match opts.context {
        Some(raw) => parse_context(raw)?,
        None => def.context.clone(),
    };
    let fail_fast = opts.fail_fast || def.fail_fast;

    let progress = if opts.json || opts.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(def.tasks.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("=> "),
        );
        bar
    };
    let hook_bar = progress.clone();
    orchestrator.on_task_complete(move |task, result| {
        hook_bar.inc(1);
        hook_bar.set_message(format!("{} {}", task.id, result.status));
    });

    let mut orchestrator = orchestrator.with_audit_sink(JsonlAuditSink::from_config(&config.audit));
    let result = orchestrator
        .execute(&def.name, context, fail_fast)
        .await
        .with_context(|| format!("Workflow '{}' failed validation", def.name))?;
    progress.finish_and_clear();

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if !opts.quiet {
        print_summary(&result);
    }

    Ok(result.status)
}

fn status_cell(status: TaskStatus) -> Cell {
    let color = match status {
        TaskStatus::Completed => Color::Green,
        TaskStatus::Failed => Color::Red,
        TaskStatus::Skipped | TaskStatus::Cancelled => Color::Yellow,
        TaskStatus::Pending | TaskStatus::Running => Color::Grey,
    };
    Cell::new(status.to_string()).fg(color)
}

fn print_summary(result: &WorkflowResult) {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Task").fg(Color::Cyan),
            Cell::new("Status"),
            Cell::new("Retries"),
            Cell::new("Duration"),
            Cell::new("Error"),
        ]);

    for (id, task) in &result.tasks {
        table.add_row(vec![
            Cell::new(id),
            status_cell(task.status),
            Cell::new(task.retries),
            Cell::new(format!("{}ms", task.duration_ms)),
            Cell::new(task.error.as_deref().unwrap_or("")),
        ]);
    }

    let marker = match result.status {
        WorkflowStatus::Completed => style("*").green().bold(),
        WorkflowStatus::Partial => style("!").yellow().bold(),
        WorkflowStatus::Failed => style("x").red().bold(),
    };

    println!();
    println!(
        "  {} Workflow '{}' {} in {}ms",
        marker,
        style(&result.name).cyan(),
        result.status,
        result.duration_ms
    );
    println!(
        "  {} completed, {} failed ({} skipped), {} cancelled of {}",
        result.metadata.completed,
        result.metadata.failed,
        result.metadata.skipped,
        result.metadata.cancelled,
        result.metadata.total
    );
    println!();
    println!("{table}");
    println!();
    println!("  Run ID: {}", result.workflow_id);
    println!("  Audit hash: {}", style(&result.audit_hash).dim());
    println!();
}
