//! CLI command definitions and dispatch for the `weave` binary.
//!
//! Uses clap derive macros for argument parsing. Every command that reads a
//! workflow file goes through [`load_orchestrator`], so `run`, `validate`
//! and `graph` all see the same task graph.

pub mod audit;
pub mod graph;
pub mod run;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;

use taskweave_core::Orchestrator;
use taskweave_core::workflow::definition::{WorkflowError, build_orchestrator, load_workflow_file};
use taskweave_core::workflow::visualize::GraphFormat;
use taskweave_infra::handlers::builtin_handlers;
use taskweave_types::config::EngineConfig;
use taskweave_types::workflow::WorkflowDefinition;

/// Run DAG workflows defined in YAML.
#[derive(Parser)]
#[command(name = "weave", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config.toml (defaults to ~/.taskweave/config.toml).
    #[arg(long, global = true, env = "TASKWEAVE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a workflow file.
    Run {
        /// Path to the workflow YAML file.
        file: PathBuf,

        /// Stop at the first failed task and cancel the rest.
        #[arg(long)]
        fail_fast: bool,

        /// Override the concurrency bound.
        #[arg(long)]
        max_concurrent: Option<usize>,

        /// JSON object passed to every handler (overrides the file's context).
        #[arg(long)]
        context: Option<String>,
    },

    /// Validate a workflow file and print its wave plan.
    Validate {
        /// Path to the workflow YAML file.
        file: PathBuf,
    },

    /// Render the task graph for an external viewer.
    Graph {
        /// Path to the workflow YAML file.
        file: PathBuf,

        /// Output format: mermaid or dot.
        #[arg(long, default_value = "mermaid")]
        format: GraphFormat,
    },

    /// Inspect the audit log.
    Audit {
        #[command(subcommand)]
        command: audit::AuditCommand,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Log filter for the given verbosity flags.
pub fn verbosity_filter(verbose: u8, quiet: bool, configured: &str) -> String {
    match verbose {
        0 if quiet => "error".to_string(),
        0 => configured.to_string(),
        1 => "info,taskweave_core=debug,taskweave_infra=debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Load a definition file and bind its tasks to the built-in handlers.
pub fn load_orchestrator(
    file: &Path,
    config: &EngineConfig,
) -> Result<(WorkflowDefinition, Orchestrator)> {
    let def = load_workflow_file(file).map_err(|e| match e {
        WorkflowError::ParseError(msg) => anyhow::anyhow!("Failed to parse workflow YAML: {msg}"),
        WorkflowError::ValidationError(msg) => anyhow::anyhow!("Workflow validation failed: {msg}"),
        WorkflowError::IoError(err) => anyhow::anyhow!("Failed to read {}: {err}", file.display()),
        other => anyhow::anyhow!("Failed to load workflow: {other}"),
    })?;
    let orchestrator = build_orchestrator(&def, &builtin_handlers(), config)?;
    Ok((def, orchestrator))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_flags() {
        let cli = Cli::try_parse_from([
            "weave",
            "--json",
            "run",
            "etl.yaml",
            "--fail-fast",
            "--max-concurrent",
            "3",
            "--context",
            r#"{"env":"ci"}"#,
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Run {
                file,
                fail_fast,
                max_concurrent,
                context,
            } => {
                assert_eq!(file, PathBuf::from("etl.yaml"));
                assert!(fail_fast);
                assert_eq!(max_concurrent, Some(3));
                assert_eq!(context.as_deref(), Some(r#"{"env":"ci"}"#));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn parses_graph_format() {
        let cli = Cli::try_parse_from(["weave", "graph", "wf.yaml", "--format", "dot"]).unwrap();
        match cli.command {
            Commands::Graph { format, .. } => assert_eq!(format, GraphFormat::Dot),
            _ => panic!("expected graph"),
        }
        assert!(Cli::try_parse_from(["weave", "graph", "wf.yaml", "--format", "png"]).is_err());
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(verbosity_filter(0, true, "warn"), "error");
        assert_eq!(verbosity_filter(0, false, "warn"), "warn");
        assert!(verbosity_filter(1, false, "warn").contains("taskweave_core=debug"));
        assert_eq!(verbosity_filter(3, false, "warn"), "trace");
    }

    #[test]
    fn load_orchestrator_reports_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_orchestrator(&tmp.path().join("nope.yaml"), &EngineConfig::default())
            .unwrap_err();
        assert!(err.to_string().starts_with("Failed to read"));
    }
}
