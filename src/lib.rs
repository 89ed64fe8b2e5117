//! Stepwright - Recorded browser workflows, planned by an LLM, executed step by step
//!
//! A recorded session is turned into a prompt, the LLM answers with a step
//! plan, the plan is parsed and validated into typed steps, and the steps are
//! run against a browser page with retries, timeouts and progress events.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **Session**: Recorded workflows, prompt generation and direct replay
//! - **Plan**: Extraction, normalization, validation and repair of LLM plans
//! - **Page**: The browser capability surface and its agent-browser implementation
//! - **Strategies**: One executable operation per action kind
//! - **Execution**: The step runner, continuation policies and progress reporting
//! - **LLM**: LLM provider abstraction with Ollama and OpenAI-compatible backends
//! - **Agent**: Orchestration of planning and execution
//! - **CLI**: Command-line subcommands
//!
//! # Usage
//!
//! ```rust,no_run
//! use stepwright::{Agent, Config, RecordingSession};
//!
//! #[tokio::main]
//! async fn main() -> stepwright::Result<()> {
//!     let agent = Agent::with_config(Config::load())?;
//!     let session = RecordingSession::load("session.json".as_ref())?;
//!
//!     let result = agent.automate(&session).await?;
//!     println!("{:?}: {} steps completed", result.outcome, result.completed_steps);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod execution;
pub mod llm;
pub mod page;
pub mod plan;
pub mod session;
pub mod strategies;
pub mod telemetry;

// Re-export commonly used items
pub use agent::Agent;
pub use core::{
    ActionKind, ActionResult, Config, ExecuteResult, ExecuteStep, Result, RunOutcome,
    StepStatus, StepwrightError,
};
pub use execution::{ExecutionMonitor, ProgressEvent, ProgressReporter};
pub use page::{PageError, PageHandle};
pub use plan::{ParsedPlan, StepParser};
pub use session::{PromptGenerator, RecordingSession};
pub use strategies::{ActionStrategy, StrategyRegistry};
