//! Execution monitor integration tests
//!
//! Runs plans against the scripted page on tokio's paused clock, so retry
//! backoff, inter-step delays and timeouts are exact.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;

use common::{step, test_execution_config, ScriptedPage};
use stepwright::core::{ActionKind, ActionResult, ExecuteStep, RunOutcome, StepStatus};
use stepwright::execution::{
    progress_channel, ContinueOnFailure, ExecutionMonitor, ProgressEvent, ProgressReporter,
    ProgressStream, WorkflowStatus, CANCELLED_REASON,
};
use stepwright::page::PageHandle;
use stepwright::strategies::{ActionStrategy, StrategyRegistry};
use stepwright::StepwrightError;

fn monitor_for(page: &Arc<ScriptedPage>) -> ExecutionMonitor {
    let config = test_execution_config();
    let registry = Arc::new(StrategyRegistry::with_defaults(&config));
    ExecutionMonitor::new(page.clone(), registry, config)
}

/// Collect events up to and including the first terminal one
async fn until_terminal(events: &mut ProgressStream) -> Vec<ProgressEvent> {
    let mut seen = Vec::new();
    while let Some(event) = events.next().await {
        let terminal = event.is_terminal();
        seen.push(event);
        if terminal {
            break;
        }
    }
    seen
}

#[tokio::test(start_paused = true)]
async fn test_retries_with_increasing_backoff() {
    let page = Arc::new(ScriptedPage::new().failing("#flaky"));
    let monitor = monitor_for(&page).with_policy(ContinueOnFailure);

    let result = monitor
        .run(vec![step(1, ActionKind::Click, "#flaky", 3)])
        .await
        .unwrap();

    // One attempt plus three retries
    let times = page.call_times("#flaky");
    assert_eq!(times.len(), 4);

    let gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
    assert!(gaps.windows(2).all(|w| w[0] < w[1]), "gaps {:?}", gaps);
    // inter-step delay + 500ms * 2^retry
    assert!(gaps[0] >= Duration::from_millis(2_000));
    assert!(gaps[1] >= Duration::from_millis(3_000));
    assert!(gaps[2] >= Duration::from_millis(5_000));

    let failed = &result.steps[0];
    assert_eq!(failed.status, StepStatus::Failed);
    assert_eq!(failed.retry_count, 3);
    assert_eq!(result.outcome, RunOutcome::Failure);
    assert!(!result.success);
}

#[tokio::test(start_paused = true)]
async fn test_flaky_step_recovers() {
    let page = Arc::new(ScriptedPage::new().flaky("#late", 2));
    let monitor = monitor_for(&page);

    let result = monitor
        .run(vec![step(1, ActionKind::Click, "#late", 3)])
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.steps[0].retry_count, 2);
    assert_eq!(page.attempts("#late"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_second_run_is_rejected_while_active() {
    let page = Arc::new(ScriptedPage::new().slow("#slow", Duration::from_secs(5)));
    let (sender, mut events) = progress_channel();
    let monitor = Arc::new(monitor_for(&page).with_progress(sender));

    let runner = Arc::clone(&monitor);
    let first = tokio::spawn(async move {
        runner
            .run(vec![step(1, ActionKind::Click, "#slow", 0)])
            .await
    });

    // Wait until the first run is inside its step
    loop {
        match events.next().await {
            Some(ProgressEvent::StepStart { .. }) => break,
            Some(_) => continue,
            None => panic!("progress stream closed early"),
        }
    }
    assert!(monitor.is_running());

    let err = monitor
        .run(vec![step(1, ActionKind::Click, "#other", 0)])
        .await
        .unwrap_err();
    assert!(matches!(err, StepwrightError::AlreadyExecuting));

    let result = first.await.unwrap().unwrap();
    assert!(result.success);
    assert_eq!(page.attempts("#other"), 0);
    assert!(!monitor.is_running());

    // The monitor is free again once the first run ended
    let again = monitor
        .run(vec![step(1, ActionKind::Click, "#other", 0)])
        .await
        .unwrap();
    assert!(again.success);
}

#[tokio::test(start_paused = true)]
async fn test_partial_run_keeps_data_of_completed_steps() {
    let page = Arc::new(ScriptedPage::new().failing("#bad"));
    let monitor = monitor_for(&page);

    let result = monitor
        .run(vec![
            step(1, ActionKind::Extract, "#a", 0),
            step(2, ActionKind::Click, "#b", 0),
            step(3, ActionKind::Click, "#bad", 0),
            step(4, ActionKind::Extract, "#c", 0),
        ])
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.outcome, RunOutcome::Partial);
    assert_eq!(result.completed_steps, 3);
    assert_eq!(result.failed_steps, 1);

    let ids: Vec<&str> = result.data.iter().map(|d| d.step_id.as_str()).collect();
    assert_eq!(ids, vec!["step-1", "step-4"]);
    assert_eq!(result.data[1].data["text"], "content of #c");

    let error = result.error.unwrap();
    assert!(error.contains("step-3"), "{}", error);
    assert!(error.contains("Element not found: #bad"), "{}", error);
}

#[tokio::test(start_paused = true)]
async fn test_failed_first_navigate_aborts_run() {
    let page = Arc::new(ScriptedPage::new().failing("https://down.test/"));
    let monitor = monitor_for(&page);

    let result = monitor
        .run(vec![
            step(1, ActionKind::Navigate, "https://down.test", 1),
            step(2, ActionKind::Click, "#b", 0),
        ])
        .await
        .unwrap();

    assert_eq!(result.outcome, RunOutcome::Failure);
    assert_eq!(result.steps[0].status, StepStatus::Failed);
    assert_eq!(result.steps[1].status, StepStatus::Pending);
    assert_eq!(page.attempts("#b"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_error_stops_without_retry() {
    let page = Arc::new(ScriptedPage::new().fatal_on("#gone"));
    let (sender, mut events) = progress_channel();
    let monitor = monitor_for(&page).with_progress(sender);

    let result = monitor
        .run(vec![
            step(1, ActionKind::Click, "#a", 3),
            step(2, ActionKind::Click, "#gone", 3),
            step(3, ActionKind::Click, "#c", 3),
        ])
        .await
        .unwrap();

    assert_eq!(page.attempts("#gone"), 1);
    assert_eq!(page.attempts("#c"), 0);
    assert_eq!(result.steps[1].status, StepStatus::Failed);
    assert_eq!(result.steps[2].status, StepStatus::Pending);
    assert!(result.error.unwrap().contains("disconnected"));

    let seen = until_terminal(&mut events).await;
    let terminals: Vec<&ProgressEvent> = seen.iter().filter(|e| e.is_terminal()).collect();
    assert_eq!(terminals.len(), 1);
    assert!(matches!(terminals[0], ProgressEvent::WorkflowError { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_fatal_error_while_reporting_url_mismatch() {
    let page = Arc::new(ScriptedPage::new().fatal_on("current_url"));
    let (sender, mut events) = progress_channel();
    let monitor = monitor_for(&page).with_progress(sender);

    let result = monitor
        .run(vec![
            step(1, ActionKind::VerifyUrl, "", 3).with_value("https://expected.test"),
            step(2, ActionKind::Click, "#next", 3),
        ])
        .await
        .unwrap();

    assert_eq!(page.attempts("https://expected.test"), 1);
    assert_eq!(page.attempts("#next"), 0);
    assert_eq!(result.steps[0].status, StepStatus::Failed);
    assert!(result.error.unwrap().contains("disconnected"));

    let seen = until_terminal(&mut events).await;
    assert!(matches!(seen.last(), Some(ProgressEvent::WorkflowError { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_a_soft_failure() {
    let page = Arc::new(ScriptedPage::new().slow("#hang", Duration::from_secs(120)));
    let monitor = monitor_for(&page).with_policy(ContinueOnFailure);

    let result = monitor
        .run(vec![
            step(1, ActionKind::Click, "#hang", 0),
            step(2, ActionKind::Click, "#next", 0),
        ])
        .await
        .unwrap();

    assert_eq!(result.steps[0].status, StepStatus::Failed);
    assert_eq!(result.steps[1].status, StepStatus::Completed);
    assert_eq!(result.outcome, RunOutcome::Partial);
    assert!(result.error.unwrap().contains("timed out after 30000ms"));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_after_first_step() {
    let page = Arc::new(ScriptedPage::new());
    let (sender, mut events) = progress_channel();
    let monitor = Arc::new(monitor_for(&page).with_progress(sender));

    let runner = Arc::clone(&monitor);
    let run = tokio::spawn(async move {
        runner
            .run(vec![
                step(1, ActionKind::Click, "#one", 0),
                step(2, ActionKind::Click, "#two", 0),
                step(3, ActionKind::Click, "#three", 0),
            ])
            .await
    });

    let mut seen = Vec::new();
    while let Some(event) = events.next().await {
        let first_done = matches!(
            event,
            ProgressEvent::StepComplete { step_index: 0, .. }
        );
        seen.push(event);
        if first_done {
            monitor.cancel();
            break;
        }
    }
    seen.extend(until_terminal(&mut events).await);

    let result = run.await.unwrap().unwrap();
    assert!(!result.success);
    assert!(result.cancelled);
    assert_eq!(result.outcome, RunOutcome::Failure);
    assert_eq!(result.error.as_deref(), Some(CANCELLED_REASON));

    let statuses: Vec<StepStatus> = result.steps.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![StepStatus::Completed, StepStatus::Pending, StepStatus::Pending]
    );
    assert_eq!(page.trace(), vec!["click #one"]);

    match seen.last() {
        Some(ProgressEvent::WorkflowComplete { result, .. }) => assert!(result.cancelled),
        other => panic!("unexpected terminal event {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_missing_strategy_fails_before_running() {
    let page = Arc::new(ScriptedPage::new());
    let config = test_execution_config();
    let mut registry = StrategyRegistry::with_defaults(&config);
    registry.unregister(ActionKind::Hover);
    let monitor = ExecutionMonitor::new(page.clone(), Arc::new(registry), config);

    let err = monitor
        .run(vec![
            step(1, ActionKind::Click, "#a", 0),
            step(2, ActionKind::Hover, "#menu", 0),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, StepwrightError::NoStrategy(ActionKind::Hover)));
    assert!(page.calls().is_empty());
    assert!(!monitor.is_running());
}

struct FixedExtract;

#[async_trait]
impl ActionStrategy for FixedExtract {
    async fn execute(
        &self,
        step: &ExecuteStep,
        _page: &dyn PageHandle,
    ) -> stepwright::Result<ActionResult> {
        Ok(ActionResult::success_with_data(
            "fixed",
            json!({ "target": step.target }),
        ))
    }
}

#[tokio::test(start_paused = true)]
async fn test_registered_strategy_overrides_default() {
    let page = Arc::new(ScriptedPage::new());
    let config = test_execution_config();
    let mut registry = StrategyRegistry::with_defaults(&config);
    registry.register(ActionKind::Extract, FixedExtract);
    let monitor = ExecutionMonitor::new(page.clone(), Arc::new(registry), config);

    let result = monitor
        .run(vec![step(1, ActionKind::Extract, "#price", 0)])
        .await
        .unwrap();

    assert_eq!(result.data[0].data, json!({ "target": "#price" }));
    assert!(page.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_event_sequence_and_reporter() {
    let page = Arc::new(ScriptedPage::new());
    let (sender, events) = progress_channel();
    let monitor = Arc::new(monitor_for(&page).with_progress(sender));

    let runner = Arc::clone(&monitor);
    let run = tokio::spawn(async move {
        runner
            .run(vec![
                step(1, ActionKind::Navigate, "https://x.test", 0),
                step(2, ActionKind::Click, "#go", 0),
            ])
            .await
    });

    let mut kinds = Vec::new();
    let mut events = events.inspect(|e| kinds.push(e.kind()));
    let mut reporter = ProgressReporter::new();
    let progress = reporter
        .drive(&mut events, Duration::from_millis(250))
        .await
        .unwrap();
    drop(events);

    let result = run.await.unwrap().unwrap();
    assert!(result.success);

    assert_eq!(
        kinds,
        vec![
            "workflow_start",
            "step_start",
            "step_complete",
            "step_start",
            "step_complete",
            "workflow_complete",
        ]
    );

    assert_eq!(progress.status, WorkflowStatus::Completed);
    assert_eq!(progress.percentage, 100.0);
    assert_eq!(progress.current_step, 1);
    assert!(progress
        .steps
        .iter()
        .all(|s| s.status == StepStatus::Completed));
}
