//! lockgen - Multi-ecosystem lockfile regeneration CLI tool
//!
//! Loads a run plan, regenerates the npm, Yarn and pnpm lockfiles it
//! touches in a repository checkout, and reports the resulting file changes.

use clap::Parser;
use lockgen::cli::CliArgs;
use lockgen::orchestrator::ArtifactOrchestrator;
use lockgen::output::{create_formatter, OutputConfig};
use lockgen::plan::RunPlan;
use lockgen::scm::GitCli;
use lockgen::workspace::LocalWorkingTree;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "LOCKGEN_LOG";

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(&args);

    // Run the main logic and handle errors
    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Install the stderr log subscriber
fn init_logging(args: &CliArgs) {
    let filter = if args.verbose {
        EnvFilter::new("lockgen=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    if args.verbose {
        eprintln!("lockgen v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("Plan: {}", args.plan.display());
        eprintln!("Checkout: {}", args.dir.display());
    }

    let plan = RunPlan::load(&args.plan)?;
    let RunPlan {
        config,
        package_files,
        host_rules,
    } = plan;

    let orchestrator = ArtifactOrchestrator::new(
        Arc::new(LocalWorkingTree::new(&args.dir)),
        Arc::new(GitCli::new(&args.dir).with_remote(&args.remote)),
        Arc::new(host_rules),
    )
    .with_system_generators(&args.dir)
    .with_progress(args.show_progress());

    let output = orchestrator
        .get_additional_files(&config, &package_files)
        .await?;

    let formatter = create_formatter(OutputConfig::from_cli(args.json, args.verbose, args.quiet));
    let mut stdout = io::stdout().lock();
    formatter.format(&output, &mut stdout)?;
    stdout.flush()?;

    if output.has_errors() {
        // Partial success - some lockfiles failed to generate
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
