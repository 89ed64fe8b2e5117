//! Replication path - recorded actions copied 1:1 into executable steps

use tracing::warn;

use crate::core::{ActionKind, ExecuteStep, StepStatus};
use crate::plan::normalize::normalize_action_type;
use crate::session::model::{RecordedAction, RecordingSession};

/// Convert every recorded action into a pending step, in recording order
pub fn steps_from_session(session: &RecordingSession, max_retries: u32) -> Vec<ExecuteStep> {
    session
        .actions
        .iter()
        .enumerate()
        .map(|(index, action)| step_from_action(index, action, max_retries))
        .collect()
}

fn step_from_action(index: usize, action: &RecordedAction, max_retries: u32) -> ExecuteStep {
    let kind = action.kind().unwrap_or_else(|| {
        warn!(recorded = %action.action_type, index, "Recorded action has no direct equivalent");
        normalize_action_type(&action.action_type)
    });

    // Recorders store the URL of a navigation in `value`
    let target = match (kind, action.target.selector.trim()) {
        (ActionKind::Navigate, "") => action.value.clone().unwrap_or_default(),
        (_, selector) => selector.to_string(),
    };

    let description = if action.description.trim().is_empty() {
        format!("{} {}", kind.label(), target).trim().to_string()
    } else {
        action.description.clone()
    };

    ExecuteStep {
        id: format!("step-{}", index + 1),
        action: kind,
        description,
        target,
        value: action.value.clone(),
        reasoning: action.intent.clone(),
        status: StepStatus::Pending,
        max_retries,
        retry_count: 0,
    }
}
