//! taskweave command-line entry point.
//!
//! Binary name: `weave`
//!
//! Parses CLI arguments, loads the engine config, sets up tracing, then
//! dispatches to the command handler. Exits non-zero when a workflow does
//! not complete or an audit log fails verification.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use taskweave_infra::config::{default_config_path, load_engine_config};
use taskweave_observe::tracing_setup::{init_tracing, shutdown_tracing};
use taskweave_types::workflow::WorkflowStatus;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Shell completions don't need config or tracing
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "weave", &mut std::io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = load_engine_config(&config_path).await;

    let filter = cli::verbosity_filter(cli.verbose, cli.quiet, &config.telemetry.log_filter);
    if let Err(e) = init_tracing(&filter, config.telemetry.otel) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }
    tracing::debug!(config = %config_path.display(), "configuration loaded");

    let outcome = match cli.command {
        Commands::Run {
            file,
            fail_fast,
            max_concurrent,
            context,
        } => {
            let status = cli::run::run_workflow(
                cli::run::RunOptions {
                    file: &file,
                    fail_fast,
                    max_concurrent,
                    context: context.as_deref(),
                    json: cli.json,
                    quiet: cli.quiet,
                },
                &config,
            )
            .await;
            status.map(|s| s == WorkflowStatus::Completed)
        }

        Commands::Validate { file } => {
            cli::validate::validate_workflow(&file, &config, cli.json).map(|()| true)
        }

        Commands::Graph { file, format } => {
            cli::graph::render_graph(&file, format, &config).map(|()| true)
        }

        Commands::Audit { command } => {
            cli::audit::handle_audit_command(command, &config, cli.json).await
        }

        Commands::Completions { .. } => Ok(true),
    };

    shutdown_tracing();

    match outcome? {
        true => Ok(ExitCode::SUCCESS),
        false => Ok(ExitCode::FAILURE),
    }
}
