//! uicheck CLI - Main Entry Point
//!
//! Runs declarative browser scenarios against a web app and exits
//! non-zero when any of them does not pass.

use clap::{Parser, Subcommand};

use uicheck_cli::commands::{self, list, run, Overrides};
use uicheck_cli::output;

/// uicheck - Rust-driven UI verification harness
#[derive(Parser)]
#[command(name = "uicheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (defaults to ./uicheck.toml when present)
    #[arg(long, global = true, env = "UICHECK_CONFIG")]
    config: Option<std::path::PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scenario file, or one scenario by name
    Run(run::RunArgs),

    /// Run every scenario under the scenarios path
    RunAll(run::RunAllArgs),

    /// List loaded scenarios
    List(list::ListArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            1
        }
    };

    std::process::exit(code);
}

async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let config = commands::resolve_config(cli.config.as_deref(), cli.overrides)?;

    match cli.command {
        Commands::Run(args) => run::execute_run(args, &config, cli.format).await,
        Commands::RunAll(args) => run::execute_run_all(args, &config, cli.format).await,
        Commands::List(args) => list::execute(args, &config, cli.format),
    }
}
