//! `weave validate`: check a workflow file and print its wave plan.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use serde_json::json;

use taskweave_types::config::EngineConfig;

use super::load_orchestrator;

/// Validate `file` and print the dependency-depth waves.
///
/// Runs the same checks as `weave run` (structure, dependencies, cycles,
/// handler names) without executing anything.
pub fn validate_workflow(file: &Path, config: &EngineConfig, json: bool) -> Result<()> {
    let (def, orchestrator) = load_orchestrator(file, config)?;
    orchestrator
        .validate()
        .with_context(|| format!("Workflow '{}' is invalid", def.name))?;
    let waves = orchestrator.execution_plan()?;

    if json {
        let out = json!({
            "name": def.name,
            "valid": true,
            "tasks": def.tasks.len(),
            "waves": waves,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Workflow '{}' is valid ({} tasks, {} waves)",
        style("*").green().bold(),
        style(&def.name).cyan(),
        def.tasks.len(),
        waves.len()
    );
    if let Some(description) = &def.description {
        println!("  {}", style(description).dim());
    }
    println!();
    for (index, wave) in waves.iter().enumerate() {
        println!("  Wave {}: {}", index + 1, wave.join(", "));
    }
    println!();
    Ok(())
}
