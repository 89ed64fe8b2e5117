//! Agent orchestrator
//!
//! Main entry point of the library: turns a recorded session into a step
//! plan through the LLM and runs it against the page.
//! session -> prompt -> LLM -> parser -> execution monitor

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::{Config, ExecuteResult, Result, StepwrightError};
use crate::execution::{ContinuationPolicy, ExecutionMonitor, ProgressSender};
use crate::llm::{create_provider, LLMProvider};
use crate::page::{AgentBrowserPage, PageHandle};
use crate::plan::{ParsedPlan, StepParser};
use crate::session::{steps_from_session, PromptGenerator, RecordingSession};
use crate::strategies::StrategyRegistry;

/// Coordinates the LLM, the plan parser and the execution monitor
pub struct Agent {
    /// Configuration
    config: Config,
    /// LLM client used for planning
    llm: Arc<dyn LLMProvider>,
    parser: StepParser,
    prompts: PromptGenerator,
    /// Runs plans against the page this agent drives
    monitor: ExecutionMonitor,
    /// Parent of every operation token; replaced once cancelled
    cancel: Mutex<CancellationToken>,
}

impl Agent {
    /// Create an agent over an explicit provider and page
    pub fn new(config: Config, llm: Arc<dyn LLMProvider>, page: Arc<dyn PageHandle>) -> Self {
        let registry = Arc::new(StrategyRegistry::with_defaults(&config.execution));
        let monitor = ExecutionMonitor::new(page, registry, config.execution.clone());

        Self {
            parser: StepParser::from_config(&config),
            prompts: PromptGenerator::default(),
            llm,
            monitor,
            config,
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Create an agent with the configured provider and an agent-browser page
    pub fn with_config(config: Config) -> Result<Self> {
        let llm = create_provider(&config)?;
        let page = Arc::new(AgentBrowserPage::from_config(&config.browser));
        Ok(Self::new(config, llm, page))
    }

    /// Publish progress events of every run on this channel
    pub fn with_progress(mut self, sender: ProgressSender) -> Self {
        self.monitor = self.monitor.with_progress(sender);
        self
    }

    /// Replace the continuation policy of the monitor
    pub fn with_policy(mut self, policy: impl ContinuationPolicy + 'static) -> Self {
        self.monitor = self.monitor.with_policy(policy);
        self
    }

    /// Ask the LLM for a plan of the recorded session
    pub async fn plan(&self, session: &RecordingSession) -> Result<ParsedPlan> {
        let prompt = self.prompts.generate(session);
        info!(
            provider = self.llm.name(),
            goal = %session.task_goal,
            actions = session.actions.len(),
            "Requesting step plan"
        );

        let response = self.llm.call(&prompt.system, &prompt.user).await?;
        debug!(chars = response.content.len(), model = %response.model, "Plan response received");

        let plan = self.parser.parse_and_validate_steps(&response.content)?;
        info!(
            steps = plan.steps.len(),
            warnings = plan.warnings.len(),
            fixes = plan.fixes.len(),
            "Plan ready"
        );
        Ok(plan)
    }

    /// Plan the session through the LLM and run the plan
    ///
    /// A cancel during planning is honoured once the plan is parsed: the run
    /// starts and ends at once with every step pending.
    pub async fn automate(&self, session: &RecordingSession) -> Result<ExecuteResult> {
        let token = self.operation_token();
        let plan = self.plan(session).await?;
        if token.is_cancelled() {
            info!("Cancelled while planning");
        }
        self.monitor.run_with_cancel(plan.steps, token).await
    }

    /// Run the recorded actions directly, without the LLM
    pub async fn replay(&self, session: &RecordingSession) -> Result<ExecuteResult> {
        let token = self.operation_token();
        let steps = steps_from_session(session, self.config.execution.max_retries);
        if steps.is_empty() {
            return Err(StepwrightError::NoValidSteps(format!(
                "session '{}' has no replayable actions",
                session.id
            )));
        }
        info!(steps = steps.len(), "Replaying recorded session");
        self.monitor.run_with_cancel(steps, token).await
    }

    /// Parse raw plan text (e.g. a saved LLM response) and run it
    pub async fn execute_text(&self, raw: &str) -> Result<ExecuteResult> {
        let token = self.operation_token();
        let plan = self.parser.parse_and_validate_steps(raw)?;
        self.monitor.run_with_cancel(plan.steps, token).await
    }

    /// Parse raw plan text without running it
    pub fn parse(&self, raw: &str) -> Result<ParsedPlan> {
        self.parser.parse_and_validate_steps(raw)
    }

    /// Cancel every operation in flight
    ///
    /// Covers planning as well as the run; a run stops before its next step.
    pub fn cancel(&self) {
        self.lock_cancel().cancel();
    }

    /// Token for a new operation, a child of the agent-wide token
    fn operation_token(&self) -> CancellationToken {
        let mut parent = self.lock_cancel();
        if parent.is_cancelled() {
            *parent = CancellationToken::new();
        }
        parent.child_token()
    }

    fn lock_cancel(&self) -> std::sync::MutexGuard<'_, CancellationToken> {
        self.cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_running(&self) -> bool {
        self.monitor.is_running()
    }

    /// Get current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check whether the LLM backend is reachable
    pub async fn llm_available(&self) -> bool {
        self.llm.is_available().await
    }
}
