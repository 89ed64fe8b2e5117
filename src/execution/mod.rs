//! Execution module - runs step plans and reports their progress
//!
//! - `monitor`: the step runner with retries, timeouts and cancellation
//! - `policy`: what a failed step means for the rest of the plan
//! - `events`: progress events and their channel
//! - `progress`: the live view model built from those events

pub mod events;
pub mod monitor;
pub mod policy;
pub mod progress;

pub use events::{progress_channel, ProgressEvent, ProgressSender, ProgressStream, StepSummary, IPC_PREFIX};
pub use monitor::{ExecutionMonitor, CANCELLED_REASON};
pub use policy::{
    AbortOnFailure, BootstrapPolicy, Continuation, ContinuationPolicy, ContinueOnFailure,
    FailureContext,
};
pub use progress::{ProgressReporter, StepProgress, WorkflowProgress, WorkflowStatus};
