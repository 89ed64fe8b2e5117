//! Stepwright - Turns recorded browser workflows into executed step plans
//!
//! Main entry point for the CLI application.

use std::path::PathBuf;

use clap::Parser;
use stepwright::cli::{handle_command, Command, OutputOptions};
use stepwright::{telemetry, Config};

/// Stepwright - Turns recorded browser workflows into executed step plans
#[derive(Parser, Debug)]
#[command(name = "stepwright")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: ~/.config/stepwright/config.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Run in headed browser mode (visible window)
    #[arg(long, global = true)]
    headed: bool,

    /// agent-browser session name
    #[arg(long, global = true)]
    session: Option<String>,

    /// Retries per step after the first attempt
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    /// Stream progress as WORKFLOW_PROGRESS lines on stderr
    #[arg(long, global = true)]
    progress_json: bool,

    /// Enable debug output
    #[arg(long, short = 'd', global = true)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build configuration
    let mut config = match &args.config {
        Some(path) => {
            let _ = dotenvy::dotenv();
            Config::load_from_path(path)?
        }
        None => Config::load(),
    };

    // Apply CLI overrides
    if args.headed {
        config.browser.headed = true;
    }

    if let Some(session) = args.session {
        config.browser.session_name = session;
    }

    if let Some(max_retries) = args.max_retries {
        config.execution.max_retries = max_retries;
    }

    telemetry::init(&config.logging, args.debug);

    let output = OutputOptions {
        progress_json: args.progress_json,
    };

    let result = handle_command(args.command, config, output).await?;
    if !result.succeeded() {
        std::process::exit(1);
    }

    Ok(())
}
