//! Progress events and the channel that carries them
//!
//! Events are plain data so they can cross a process boundary. On the wire
//! each event is `{"timestamp", "type", "data"}`, one per
//! `WORKFLOW_PROGRESS:` line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::trace;

use crate::core::{ActionResult, ExecuteResult, ExecuteStep, StepStatus};

/// Prefix of progress lines written for a parent process
pub const IPC_PREFIX: &str = "WORKFLOW_PROGRESS:";

/// Step identity announced at workflow start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    pub id: String,
    pub label: String,
}

impl From<&ExecuteStep> for StepSummary {
    fn from(step: &ExecuteStep) -> Self {
        Self {
            id: step.id.clone(),
            label: step.label(),
        }
    }
}

/// One discrete progress notification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ProgressEvent {
    #[serde(rename_all = "camelCase")]
    WorkflowStart {
        workflow_id: String,
        steps: Vec<StepSummary>,
    },
    #[serde(rename_all = "camelCase")]
    StepStart { workflow_id: String, step_index: usize },
    #[serde(rename_all = "camelCase")]
    StepComplete {
        workflow_id: String,
        step_index: usize,
        status: StepStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<ActionResult>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    WorkflowComplete {
        workflow_id: String,
        result: ExecuteResult,
    },
    #[serde(rename_all = "camelCase")]
    WorkflowError { workflow_id: String, error: String },
}

impl ProgressEvent {
    pub fn workflow_id(&self) -> &str {
        match self {
            ProgressEvent::WorkflowStart { workflow_id, .. }
            | ProgressEvent::StepStart { workflow_id, .. }
            | ProgressEvent::StepComplete { workflow_id, .. }
            | ProgressEvent::WorkflowComplete { workflow_id, .. }
            | ProgressEvent::WorkflowError { workflow_id, .. } => workflow_id,
        }
    }

    /// Wire name of the event
    pub fn kind(&self) -> &'static str {
        match self {
            ProgressEvent::WorkflowStart { .. } => "workflow_start",
            ProgressEvent::StepStart { .. } => "step_start",
            ProgressEvent::StepComplete { .. } => "step_complete",
            ProgressEvent::WorkflowComplete { .. } => "workflow_complete",
            ProgressEvent::WorkflowError { .. } => "workflow_error",
        }
    }

    /// workflow_complete or workflow_error
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::WorkflowComplete { .. } | ProgressEvent::WorkflowError { .. }
        )
    }

    /// `WORKFLOW_PROGRESS: {...}` line, stamped now
    pub fn to_ipc_line(&self) -> serde_json::Result<String> {
        let envelope = EventEnvelope {
            timestamp: Utc::now(),
            event: self,
        };
        Ok(format!("{} {}", IPC_PREFIX, serde_json::to_string(&envelope)?))
    }
}

#[derive(Serialize)]
struct EventEnvelope<'a> {
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    event: &'a ProgressEvent,
}

/// Stream side of a progress channel
pub type ProgressStream = UnboundedReceiverStream<ProgressEvent>;

/// Sending side of a progress channel
///
/// Emitting never blocks and never fails the run; events to a dropped
/// receiver are discarded.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressSender {
    pub fn emit(&self, event: ProgressEvent) {
        trace!(workflow_id = %event.workflow_id(), kind = event.kind(), "progress");
        if self.tx.send(event).is_err() {
            trace!("Progress receiver dropped");
        }
    }
}

/// Create a connected sender and stream
pub fn progress_channel() -> (ProgressSender, ProgressStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressSender { tx }, UnboundedReceiverStream::new(rx))
}
