//! `weave graph`: render the task graph as Mermaid or DOT.

use std::path::Path;

use anyhow::Result;

use taskweave_core::workflow::visualize::GraphFormat;
use taskweave_types::config::EngineConfig;

use super::load_orchestrator;

/// Print the graph of `file`. Every task shows as pending since nothing ran.
pub fn render_graph(file: &Path, format: GraphFormat, config: &EngineConfig) -> Result<()> {
    let (_, orchestrator) = load_orchestrator(file, config)?;
    print!("{}", orchestrator.visualize_as(format));
    Ok(())
}
