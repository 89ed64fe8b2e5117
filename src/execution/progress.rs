//! Progress reporter - folds progress events into a live view of a run
//!
//! Updates are keyed on (workflow, step, status) and only move a step forward
//! through pending -> running -> completed/failed, so duplicated or reordered
//! events never corrupt the view. Snapshots are published on a watch channel.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::core::{ActionResult, ExecuteResult, StepStatus};
use crate::execution::events::{ProgressEvent, StepSummary};

/// Most events kept while waiting for their workflow_start
const MAX_EARLY_EVENTS: usize = 256;

/// Shortest tick accepted by [`ProgressReporter::drive`]
const MIN_TICK: Duration = Duration::from_millis(10);

/// Overall state of the tracked run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepProgress {
    pub id: String,
    pub label: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ActionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepProgress {
    fn pending(summary: &StepSummary) -> Self {
        Self {
            id: summary.id.clone(),
            label: summary.label.clone(),
            status: StepStatus::Pending,
            started_at: None,
            finished_at: None,
            result: None,
            error: None,
        }
    }

    /// Move to `status` unless that would go backwards or repeat
    fn advance(&mut self, status: StepStatus) -> bool {
        if status.rank() <= self.status.rank() {
            return false;
        }
        let now = Utc::now();
        if status == StepStatus::Running || self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if status.is_terminal() {
            self.finished_at = Some(now);
        }
        self.status = status;
        true
    }
}

/// View model of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowProgress {
    pub workflow_id: String,
    pub status: WorkflowStatus,
    pub steps: Vec<StepProgress>,
    /// Highest step index seen so far
    pub current_step: usize,
    /// Completed steps over total, 0..=100
    pub percentage: f64,
    pub elapsed_ms: u64,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowProgress {
    pub fn is_finished(&self) -> bool {
        self.status != WorkflowStatus::Running
    }

    fn completed(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count()
    }

    fn recompute(&mut self) {
        self.percentage = if self.steps.is_empty() {
            if self.is_finished() {
                100.0
            } else {
                0.0
            }
        } else {
            self.completed() as f64 * 100.0 / self.steps.len() as f64
        };
    }
}

/// Consumes progress events and keeps the latest `WorkflowProgress`
pub struct ProgressReporter {
    progress: Option<WorkflowProgress>,
    started: Option<Instant>,
    /// Step events that arrived before their workflow_start, oldest first
    early: VecDeque<ProgressEvent>,
    tx: watch::Sender<Option<WorkflowProgress>>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            progress: None,
            started: None,
            early: VecDeque::new(),
            tx,
        }
    }

    /// Receive a snapshot after every change and tick
    pub fn subscribe(&self) -> watch::Receiver<Option<WorkflowProgress>> {
        self.tx.subscribe()
    }

    pub fn progress(&self) -> Option<&WorkflowProgress> {
        self.progress.as_ref()
    }

    /// Fold one event into the view; returns whether anything changed
    pub fn apply(&mut self, event: &ProgressEvent) -> bool {
        let changed = self.fold(event);
        if changed {
            self.refresh_elapsed();
            self.publish();
        }
        changed
    }

    fn fold(&mut self, event: &ProgressEvent) -> bool {
        if let ProgressEvent::WorkflowStart { workflow_id, steps } = event {
            if self.tracks(workflow_id) {
                return false;
            }
            self.start(workflow_id, steps);
            let early = std::mem::take(&mut self.early);
            for pending in early.iter().filter(|e| e.workflow_id() == workflow_id) {
                self.fold(pending);
            }
            return true;
        }

        let Some(progress) = self.progress.as_mut() else {
            debug!(kind = event.kind(), "Buffering event received before workflow_start");
            self.buffer(event);
            return false;
        };
        if progress.workflow_id != event.workflow_id() {
            if progress.is_finished() {
                self.buffer(event);
            } else {
                debug!(workflow_id = %event.workflow_id(), "Ignoring event for another workflow");
            }
            return false;
        }

        match event {
            ProgressEvent::WorkflowStart { .. } => false,
            ProgressEvent::StepStart { step_index, .. } => {
                Self::update_step(progress, *step_index, StepStatus::Running, None, None)
            }
            ProgressEvent::StepComplete {
                step_index,
                status,
                result,
                error,
                ..
            } => Self::update_step(progress, *step_index, *status, result.clone(), error.clone()),
            ProgressEvent::WorkflowComplete { result, .. } => Self::finish(progress, Some(result), None),
            ProgressEvent::WorkflowError { error, .. } => {
                Self::finish(progress, None, Some(error.clone()))
            }
        }
    }

    fn buffer(&mut self, event: &ProgressEvent) {
        if self.early.len() == MAX_EARLY_EVENTS {
            self.early.pop_front();
        }
        self.early.push_back(event.clone());
    }

    fn tracks(&self, workflow_id: &str) -> bool {
        self.progress
            .as_ref()
            .is_some_and(|p| p.workflow_id == workflow_id)
    }

    fn start(&mut self, workflow_id: &str, steps: &[StepSummary]) {
        self.started = Some(Instant::now());
        self.progress = Some(WorkflowProgress {
            workflow_id: workflow_id.to_string(),
            status: WorkflowStatus::Running,
            steps: steps.iter().map(StepProgress::pending).collect(),
            current_step: 0,
            percentage: 0.0,
            elapsed_ms: 0,
            started_at: Utc::now(),
            error: None,
        });
    }

    fn update_step(
        progress: &mut WorkflowProgress,
        index: usize,
        status: StepStatus,
        result: Option<ActionResult>,
        error: Option<String>,
    ) -> bool {
        if progress.is_finished() {
            return false;
        }
        let Some(step) = progress.steps.get_mut(index) else {
            debug!(step_index = index, "Ignoring event for unknown step");
            return false;
        };
        if !step.advance(status) {
            return false;
        }
        if status.is_terminal() {
            step.result = result;
            step.error = error;
        }
        progress.current_step = progress.current_step.max(index);
        progress.recompute();
        true
    }

    fn finish(
        progress: &mut WorkflowProgress,
        result: Option<&ExecuteResult>,
        error: Option<String>,
    ) -> bool {
        if progress.is_finished() {
            return false;
        }
        match result {
            Some(result) => {
                for (index, step) in result.steps.iter().enumerate() {
                    if let Some(view) = progress.steps.get_mut(index) {
                        if view.advance(step.status) && step.status.is_terminal() {
                            progress.current_step = progress.current_step.max(index);
                        }
                    }
                }
                progress.status = if result.success {
                    WorkflowStatus::Completed
                } else {
                    WorkflowStatus::Failed
                };
                progress.error = result.error.clone();
            }
            None => {
                progress.status = WorkflowStatus::Failed;
                progress.error = error;
            }
        }
        progress.recompute();
        true
    }

    fn refresh_elapsed(&mut self) {
        if let (Some(progress), Some(started)) = (self.progress.as_mut(), self.started) {
            if !progress.is_finished() || progress.elapsed_ms == 0 {
                progress.elapsed_ms = started.elapsed().as_millis() as u64;
            }
        }
    }

    fn publish(&self) {
        self.tx.send_replace(self.progress.clone());
    }

    /// Refresh elapsed time while the run is active
    pub fn tick(&mut self) {
        if self.progress.as_ref().is_some_and(|p| !p.is_finished()) {
            self.refresh_elapsed();
            self.publish();
        }
    }

    /// Consume `events` until the tracked run finishes or the stream ends
    ///
    /// Ticks every `tick` (at least 10ms) in between so elapsed time keeps
    /// moving.
    pub async fn drive<S>(&mut self, mut events: S, tick: Duration) -> Option<WorkflowProgress>
    where
        S: Stream<Item = ProgressEvent> + Unpin,
    {
        let mut interval = tokio::time::interval(tick.max(MIN_TICK));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                event = events.next() => match event {
                    Some(event) => {
                        self.apply(&event);
                        if self.progress.as_ref().is_some_and(WorkflowProgress::is_finished) {
                            break;
                        }
                    }
                    None => break,
                },
                _ = interval.tick() => self.tick(),
            }
        }

        self.progress.clone()
    }
}
