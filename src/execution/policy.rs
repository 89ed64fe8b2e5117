//! Continuation policy - what a terminal step failure means for the run
//!
//! Consulted once per step that exhausted its retries. Fatal page errors
//! bypass the policy and always abort.

use crate::core::config::ExecutionConfig;
use crate::core::{ActionKind, ExecuteStep};

/// Verdict for the rest of the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Record the failure and run the next step
    Continue,
    /// Stop the run; it ends unsuccessful
    Abort,
}

/// Everything a policy may look at
#[derive(Debug, Clone, Copy)]
pub struct FailureContext<'a> {
    pub step: &'a ExecuteStep,
    /// Zero-based position in the plan
    pub index: usize,
    pub total: usize,
    /// The step is the plan's first navigate
    pub is_first_navigate: bool,
    pub error: &'a str,
}

/// Decides whether the run continues after a terminal step failure
pub trait ContinuationPolicy: Send + Sync {
    fn decide(&self, ctx: &FailureContext<'_>) -> Continuation;
}

impl<F> ContinuationPolicy for F
where
    F: Fn(&FailureContext<'_>) -> Continuation + Send + Sync,
{
    fn decide(&self, ctx: &FailureContext<'_>) -> Continuation {
        self(ctx)
    }
}

/// Abort while the plan is bootstrapping, continue afterwards
///
/// Bootstrapping covers the first `bootstrap_steps` steps and, optionally,
/// the first navigate wherever it sits.
#[derive(Debug, Clone)]
pub struct BootstrapPolicy {
    pub bootstrap_steps: usize,
    pub abort_on_first_navigate: bool,
}

impl BootstrapPolicy {
    pub fn from_config(config: &ExecutionConfig) -> Self {
        Self {
            bootstrap_steps: config.bootstrap_steps,
            abort_on_first_navigate: config.abort_on_first_navigate,
        }
    }
}

impl Default for BootstrapPolicy {
    fn default() -> Self {
        Self {
            bootstrap_steps: 1,
            abort_on_first_navigate: true,
        }
    }
}

impl ContinuationPolicy for BootstrapPolicy {
    fn decide(&self, ctx: &FailureContext<'_>) -> Continuation {
        let bootstrapping = ctx.index < self.bootstrap_steps
            || (self.abort_on_first_navigate
                && ctx.is_first_navigate
                && ctx.step.action == ActionKind::Navigate);
        if bootstrapping {
            Continuation::Abort
        } else {
            Continuation::Continue
        }
    }
}

/// Never abort on step failures
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinueOnFailure;

impl ContinuationPolicy for ContinueOnFailure {
    fn decide(&self, _ctx: &FailureContext<'_>) -> Continuation {
        Continuation::Continue
    }
}

/// Abort on the first step failure
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortOnFailure;

impl ContinuationPolicy for AbortOnFailure {
    fn decide(&self, _ctx: &FailureContext<'_>) -> Continuation {
        Continuation::Abort
    }
}
