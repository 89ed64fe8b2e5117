//! CLI commands
//!
//! Subcommands of the `stepwright` binary and their handlers. Results go to
//! stdout as JSON; progress and logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::agent::Agent;
use crate::core::{Config, ExecuteResult, Result, RunOutcome, StepStatus};
use crate::execution::{progress_channel, ProgressEvent, ProgressReporter, ProgressStream};
use crate::plan::StepParser;
use crate::session::{PromptGenerator, RecordingSession};

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Parse an LLM response file and print the validated plan
    Parse {
        /// File holding the raw LLM text
        file: PathBuf,
    },

    /// Print the planning prompt for a recorded session
    Prompt {
        /// Recorded session JSON
        session: PathBuf,
    },

    /// Run a saved plan (raw LLM text or a JSON step array)
    Run {
        /// Plan file
        plan: PathBuf,
    },

    /// Plan a recorded session through the LLM and run it
    Automate {
        /// Recorded session JSON
        session: PathBuf,
    },

    /// Replay a recorded session action by action, without the LLM
    Replay {
        /// Recorded session JSON
        session: PathBuf,
    },

    /// Show the effective configuration
    Config {
        /// Write the configuration to the default config file
        #[arg(long)]
        init: bool,
    },
}

/// Output switches shared by the run commands
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    /// Emit `WORKFLOW_PROGRESS:` lines instead of human progress
    pub progress_json: bool,
}

/// What the process should report when a command returns
pub enum CommandResult {
    /// Command finished; nothing further to report
    Done,
    /// A run finished with this result
    Ran(ExecuteResult),
}

impl CommandResult {
    /// Whether the process should exit successfully
    pub fn succeeded(&self) -> bool {
        match self {
            CommandResult::Done => true,
            CommandResult::Ran(result) => result.success,
        }
    }
}

/// Dispatch a subcommand
pub async fn handle_command(
    command: Command,
    config: Config,
    output: OutputOptions,
) -> Result<CommandResult> {
    match command {
        Command::Parse { file } => {
            let raw = read_text(&file)?;
            let plan = StepParser::from_config(&config).parse_and_validate_steps(&raw)?;
            for warning in &plan.warnings {
                eprintln!("warning: {}", warning.message);
            }
            for fix in &plan.fixes {
                eprintln!("fixed {}: {}", fix.step_id, fix.notes.join(", "));
            }
            println!("{}", serde_json::to_string_pretty(&plan)?);
            Ok(CommandResult::Done)
        }

        Command::Prompt { session } => {
            let session = RecordingSession::load(&session)?;
            let prompt = PromptGenerator::default().generate(&session);
            println!("=== SYSTEM ===\n{}\n\n=== USER ===\n{}", prompt.system, prompt.user);
            Ok(CommandResult::Done)
        }

        Command::Run { plan } => {
            let raw = read_text(&plan)?;
            run_with_progress(config, output, |agent| async move {
                agent.execute_text(&raw).await
            })
            .await
        }

        Command::Automate { session } => {
            let session = RecordingSession::load(&session)?;
            run_with_progress(config, output, |agent| async move {
                agent.automate(&session).await
            })
            .await
        }

        Command::Replay { session } => {
            let session = RecordingSession::load(&session)?;
            run_with_progress(config, output, |agent| async move {
                agent.replay(&session).await
            })
            .await
        }

        Command::Config { init } => {
            if init {
                let path = config.save()?;
                println!("Configuration written to {}", path.display());
            } else {
                println!("# {}", Config::config_file().display());
                println!("{}", toml_or_default(&config));
            }
            Ok(CommandResult::Done)
        }
    }
}

fn read_text(path: &Path) -> Result<String> {
    Ok(std::fs::read_to_string(path)?)
}

fn toml_or_default(config: &Config) -> String {
    toml::to_string_pretty(config).unwrap_or_else(|_| Config::default_config_toml())
}

/// Build the agent, run `job` with Ctrl+C cancellation and progress output
async fn run_with_progress<F, Fut>(
    config: Config,
    output: OutputOptions,
    job: F,
) -> Result<CommandResult>
where
    F: FnOnce(Arc<Agent>) -> Fut,
    Fut: std::future::Future<Output = Result<ExecuteResult>>,
{
    let (sender, events) = progress_channel();
    let agent = Arc::new(Agent::with_config(config)?.with_progress(sender));
    let printer = spawn_progress_printer(events, output);

    let canceller = Arc::clone(&agent);
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        eprintln!("Cancelling after the current step... (Ctrl+C again to quit)");
        canceller.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted");
            std::process::exit(130);
        }
    });

    let outcome = job(Arc::clone(&agent)).await;
    interrupt.abort();
    let _ = interrupt.await;
    // Dropping the agent closes the progress channel so the printer drains and exits.
    drop(agent);
    let _ = printer.await;

    let result = outcome?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(CommandResult::Ran(result))
}

fn spawn_progress_printer(events: ProgressStream, output: OutputOptions) -> JoinHandle<()> {
    tokio::spawn(async move {
        if output.progress_json {
            let mut events = events;
            while let Some(event) = events.next().await {
                match event.to_ipc_line() {
                    Ok(line) => eprintln!("{}", line),
                    Err(e) => tracing::warn!("Failed to encode progress event: {}", e),
                }
            }
            return;
        }

        let mut reporter = ProgressReporter::new();
        let mut events = events.inspect(|event| eprintln!("{}", render_event(event)));
        if let Some(progress) = reporter.drive(&mut events, Duration::from_secs(1)).await {
            eprintln!(
                "[Workflow] {:.0}% of steps completed in {}ms",
                progress.percentage, progress.elapsed_ms
            );
        }
    })
}

/// One human-readable line per event
fn render_event(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::WorkflowStart { steps, .. } => {
            format!("[Workflow] Starting {} step(s)", steps.len())
        }
        ProgressEvent::StepStart { step_index, .. } => {
            format!("[Step {}] Running...", step_index + 1)
        }
        ProgressEvent::StepComplete {
            step_index,
            status,
            error,
            ..
        } => {
            let mark = if *status == StepStatus::Completed { "✓" } else { "✗" };
            match error {
                Some(error) => format!("  {} step {} {}", mark, step_index + 1, error),
                None => format!("  {} step {}", mark, step_index + 1),
            }
        }
        ProgressEvent::WorkflowComplete { result, .. } => {
            let outcome = match result.outcome {
                RunOutcome::Success => "succeeded",
                RunOutcome::Partial => "partially succeeded",
                RunOutcome::Failure => "failed",
            };
            format!(
                "[Workflow] {} ({} completed, {} failed)",
                outcome, result.completed_steps, result.failed_steps
            )
        }
        ProgressEvent::WorkflowError { error, .. } => format!("[Workflow] error: {}", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_step_events() {
        let line = render_event(&ProgressEvent::StepComplete {
            workflow_id: "wf".into(),
            step_index: 1,
            status: StepStatus::Failed,
            result: None,
            error: Some("Element not found: #go".into()),
        });
        assert_eq!(line, "  ✗ step 2 Element not found: #go");

        let line = render_event(&ProgressEvent::StepStart {
            workflow_id: "wf".into(),
            step_index: 0,
        });
        assert_eq!(line, "[Step 1] Running...");
    }

    #[test]
    fn test_command_result_success() {
        assert!(CommandResult::Done.succeeded());
    }
}
