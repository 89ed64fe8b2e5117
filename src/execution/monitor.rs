//! Execution monitor - runs a step plan against one page handle
//!
//! Steps run strictly in order. Each attempt is bounded by the step timeout
//! and followed by the inter-step delay; failed attempts are retried with
//! exponential backoff until the step's retry budget is spent. Cancellation
//! is observed between steps.

use std::sync::{Arc, Mutex};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::config::ExecutionConfig;
use crate::core::{
    ActionKind, ActionResult, ExecuteResult, ExecuteStep, Result, RunOutcome, StepData,
    StepStatus, StepwrightError,
};
use crate::execution::events::{ProgressEvent, ProgressSender, StepSummary};
use crate::execution::policy::{
    BootstrapPolicy, Continuation, ContinuationPolicy, FailureContext,
};
use crate::page::PageHandle;
use crate::strategies::{ActionStrategy, StrategyRegistry};

/// Reason recorded on a cancelled run
pub const CANCELLED_REASON: &str = "cancelled by user";

/// How a single step ended
enum StepOutcome {
    Completed(ActionResult),
    Failed(String),
}

/// How the step loop ended
enum Stop {
    Finished,
    Aborted(String),
    Cancelled,
    Fatal(String),
}

/// Runs plans against a page, one at a time
///
/// A monitor owns the right to drive its page: a second `run` while one is
/// active is rejected with [`StepwrightError::AlreadyExecuting`].
pub struct ExecutionMonitor {
    page: Arc<dyn PageHandle>,
    registry: Arc<StrategyRegistry>,
    config: ExecutionConfig,
    policy: Arc<dyn ContinuationPolicy>,
    progress: Option<ProgressSender>,
    running: Arc<tokio::sync::Mutex<()>>,
    cancel: Mutex<CancellationToken>,
}

impl ExecutionMonitor {
    pub fn new(
        page: Arc<dyn PageHandle>,
        registry: Arc<StrategyRegistry>,
        config: ExecutionConfig,
    ) -> Self {
        let policy = Arc::new(BootstrapPolicy::from_config(&config));
        Self {
            page,
            registry,
            config,
            policy,
            progress: None,
            running: Arc::new(tokio::sync::Mutex::new(())),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Replace the continuation policy
    pub fn with_policy(mut self, policy: impl ContinuationPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Publish progress events on this channel
    pub fn with_progress(mut self, sender: ProgressSender) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Whether a run currently holds the page
    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    /// Request cancellation of the active run
    ///
    /// Takes effect before the next step starts; the current step finishes.
    pub fn cancel(&self) {
        self.current_token().cancel();
    }

    fn current_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(progress) = &self.progress {
            progress.emit(event);
        }
    }

    /// Run a plan to its terminal result
    pub async fn run(&self, steps: Vec<ExecuteStep>) -> Result<ExecuteResult> {
        self.run_with_cancel(steps, CancellationToken::new()).await
    }

    /// Run a plan, also stopping when `token` is cancelled
    ///
    /// Returns `Err` only when the run could not start: another run is active
    /// or a step has no registered strategy. Everything after start ends in an
    /// `ExecuteResult` and exactly one terminal progress event.
    pub async fn run_with_cancel(
        &self,
        mut steps: Vec<ExecuteStep>,
        token: CancellationToken,
    ) -> Result<ExecuteResult> {
        let _guard = self
            .running
            .clone()
            .try_lock_owned()
            .map_err(|_| StepwrightError::AlreadyExecuting)?;

        let strategies = steps
            .iter()
            .map(|step| self.registry.create_strategy(step.action))
            .collect::<Result<Vec<_>>>()?;

        *self
            .cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = token.clone();

        let workflow_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();
        let total = steps.len();
        let first_navigate = steps.iter().position(|s| s.action == ActionKind::Navigate);

        info!(workflow_id = %workflow_id, steps = total, "Workflow started");
        self.emit(ProgressEvent::WorkflowStart {
            workflow_id: workflow_id.clone(),
            steps: steps.iter().map(StepSummary::from).collect(),
        });

        let mut data = Vec::new();
        let mut first_failure: Option<String> = None;
        let mut stop = Stop::Finished;

        for index in 0..total {
            if token.is_cancelled() {
                info!(workflow_id = %workflow_id, next_step = index, "Workflow cancelled");
                stop = Stop::Cancelled;
                break;
            }

            let strategy = strategies[index].as_ref();
            let step = &mut steps[index];
            match self.run_step(&workflow_id, index, step, strategy).await {
                Ok(StepOutcome::Completed(result)) => {
                    if let Some(value) = result.data {
                        data.push(StepData {
                            step_id: step.id.clone(),
                            action: step.action,
                            data: value,
                        });
                    }
                }
                Ok(StepOutcome::Failed(reason)) => {
                    let summary = format!("Step {} ({}) failed: {}", step.id, step.action, reason);
                    let ctx = FailureContext {
                        step: &*step,
                        index,
                        total,
                        is_first_navigate: first_navigate == Some(index),
                        error: &reason,
                    };
                    if self.policy.decide(&ctx) == Continuation::Abort {
                        warn!(workflow_id = %workflow_id, step_id = %step.id, "Aborting workflow after step failure");
                        stop = Stop::Aborted(summary);
                        break;
                    }
                    first_failure.get_or_insert(summary);
                }
                Err(e) => {
                    error!(workflow_id = %workflow_id, step_id = %step.id, error = %e, "Fatal error, stopping workflow");
                    stop = Stop::Fatal(e.to_string());
                    break;
                }
            }
        }

        let completed_steps = count(&steps, StepStatus::Completed);
        let failed_steps = count(&steps, StepStatus::Failed);
        let execution_time_ms = started.elapsed().as_millis() as u64;

        let (outcome, error, cancelled) = match &stop {
            Stop::Finished if failed_steps == 0 => (RunOutcome::Success, None, false),
            Stop::Finished if completed_steps > 0 => (RunOutcome::Partial, first_failure, false),
            Stop::Finished => (RunOutcome::Failure, first_failure, false),
            Stop::Aborted(reason) | Stop::Fatal(reason) => {
                (RunOutcome::Failure, Some(reason.clone()), false)
            }
            Stop::Cancelled => (RunOutcome::Failure, Some(CANCELLED_REASON.to_string()), true),
        };

        let result = ExecuteResult {
            success: outcome == RunOutcome::Success,
            outcome,
            data,
            error,
            execution_time_ms,
            cancelled,
            completed_steps,
            failed_steps,
            steps,
        };

        info!(
            workflow_id = %workflow_id,
            success = result.success,
            completed = completed_steps,
            failed = failed_steps,
            elapsed_ms = execution_time_ms,
            "Workflow finished"
        );

        match stop {
            Stop::Fatal(reason) => self.emit(ProgressEvent::WorkflowError {
                workflow_id,
                error: reason,
            }),
            _ => self.emit(ProgressEvent::WorkflowComplete {
                workflow_id,
                result: result.clone(),
            }),
        }

        Ok(result)
    }

    /// Drive one step through its attempts
    async fn run_step(
        &self,
        workflow_id: &str,
        index: usize,
        step: &mut ExecuteStep,
        strategy: &dyn ActionStrategy,
    ) -> Result<StepOutcome> {
        step.status = StepStatus::Running;
        self.emit(ProgressEvent::StepStart {
            workflow_id: workflow_id.to_string(),
            step_index: index,
        });

        loop {
            let attempt = step.retry_count + 1;
            debug!(workflow_id, step_id = %step.id, action = %step.action, attempt, "Executing step");

            let result = match tokio::time::timeout(
                self.config.step_timeout(),
                strategy.execute(step, self.page.as_ref()),
            )
            .await
            {
                Ok(Ok(result)) => result,
                Ok(Err(e)) if e.is_fatal() => {
                    step.status = StepStatus::Failed;
                    self.emit(ProgressEvent::StepComplete {
                        workflow_id: workflow_id.to_string(),
                        step_index: index,
                        status: StepStatus::Failed,
                        result: None,
                        error: Some(e.to_string()),
                    });
                    return Err(e);
                }
                Ok(Err(e)) => ActionResult::failure(e.to_string()),
                Err(_) => ActionResult::failure(format!(
                    "Step timed out after {}ms",
                    self.config.step_timeout_ms
                )),
            };

            if result.success {
                step.status = StepStatus::Completed;
                debug!(workflow_id, step_id = %step.id, attempt, "Step completed");
                self.emit(ProgressEvent::StepComplete {
                    workflow_id: workflow_id.to_string(),
                    step_index: index,
                    status: StepStatus::Completed,
                    result: Some(result.clone()),
                    error: None,
                });
                tokio::time::sleep(self.config.inter_step_delay()).await;
                return Ok(StepOutcome::Completed(result));
            }

            let reason = result
                .error
                .clone()
                .unwrap_or_else(|| "Step failed".to_string());

            if step.retry_count < step.max_retries {
                tokio::time::sleep(self.config.inter_step_delay()).await;
                step.retry_count += 1;
                let delay = self.config.backoff_delay(step.retry_count);
                warn!(
                    workflow_id,
                    step_id = %step.id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %reason,
                    "Step failed, retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            step.status = StepStatus::Failed;
            warn!(workflow_id, step_id = %step.id, attempts = attempt, error = %reason, "Step failed");
            self.emit(ProgressEvent::StepComplete {
                workflow_id: workflow_id.to_string(),
                step_index: index,
                status: StepStatus::Failed,
                result: Some(result),
                error: Some(reason.clone()),
            });
            tokio::time::sleep(self.config.inter_step_delay()).await;
            return Ok(StepOutcome::Failed(reason));
        }
    }
}

fn count(steps: &[ExecuteStep], status: StepStatus) -> usize {
    steps.iter().filter(|s| s.status == status).count()
}
