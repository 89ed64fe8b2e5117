//! End-to-end tests of the agent: session -> prompt -> LLM -> plan -> run
//!
//! The LLM and the page are scripted; time runs on tokio's paused clock.

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use common::{test_execution_config, ScriptedLlm, ScriptedPage};
use stepwright::core::{Config, RunOutcome, StepStatus};
use stepwright::execution::{progress_channel, ProgressEvent, CANCELLED_REASON};
use stepwright::session::{RecordedAction, RecordingSession};
use stepwright::{Agent, StepwrightError};

fn test_config() -> Config {
    Config {
        execution: test_execution_config(),
        ..Config::default()
    }
}

fn agent_with(response: &str, page: &Arc<ScriptedPage>) -> (Agent, Arc<ScriptedLlm>) {
    let llm = Arc::new(ScriptedLlm::new(response));
    let agent = Agent::new(test_config(), llm.clone(), page.clone());
    (agent, llm)
}

fn search_session() -> RecordingSession {
    RecordingSession::new("Search for rust")
        .starting_at("https://x.test", "Home")
        .with_action(RecordedAction::new("type", "Type the query", "#q").with_value("hi"))
        .with_action(RecordedAction::new("click", "Submit search", "#go"))
}

#[tokio::test(start_paused = true)]
async fn test_plan_without_descriptions_runs_to_success() {
    let page = Arc::new(ScriptedPage::new());
    let (agent, llm) = agent_with(
        r##"[{"action":"navigate","target":"https://x.test"},{"action":"type","target":"#q","value":"hi"}]"##,
        &page,
    );

    let result = agent.automate(&search_session()).await.unwrap();

    assert!(result.success);
    assert_eq!(result.outcome, RunOutcome::Success);
    assert_eq!(result.completed_steps, 2);
    assert_eq!(page.trace(), vec!["navigate https://x.test/", "type #q"]);
    assert_eq!(page.calls()[1].value.as_deref(), Some("hi"));

    assert_eq!(llm.calls(), 1);
    let prompt = llm.last_user_prompt().unwrap();
    assert!(prompt.contains("TASK GOAL: Search for rust"));
    assert!(prompt.contains("#go"));
}

#[tokio::test(start_paused = true)]
async fn test_plan_wrapped_in_prose_and_fence() {
    let page = Arc::new(ScriptedPage::new());
    let (agent, _) = agent_with("", &page);

    let raw = "Here is the plan:\n```json\n[{\"action\":\"click\",\"target\":\"#btn\"}]\n```";
    let plan = agent.parse(raw).unwrap();
    assert_eq!(plan.steps.len(), 1);
    assert_eq!(plan.steps[0].target, "#btn");

    let result = agent.execute_text(raw).await.unwrap();
    assert!(result.success);
    assert_eq!(page.trace(), vec!["click #btn"]);
}

#[tokio::test(start_paused = true)]
async fn test_unfixable_step_is_dropped_not_fatal() {
    let page = Arc::new(ScriptedPage::new());
    let response = r##"I will do this:
[
  {"action": "click", "target": "#start", "description": "Start"},
  {"action": "wait", "value": "not-a-number", "description": "Let it settle"}
]"##;
    let (agent, _) = agent_with(response, &page);

    let plan = agent.plan(&search_session()).await.unwrap();
    assert_eq!(plan.steps.len(), 1);
    assert_eq!(plan.warnings.len(), 1);
    assert_eq!(plan.warnings[0].step_id, "step-2");

    let result = agent.automate(&search_session()).await.unwrap();
    assert!(result.success);
    assert_eq!(page.trace(), vec!["click #start"]);
}

#[tokio::test(start_paused = true)]
async fn test_llm_answer_without_plan_is_parse_error() {
    let page = Arc::new(ScriptedPage::new());
    let (agent, _) = agent_with("I could not understand the recording.", &page);

    let err = agent.automate(&search_session()).await.unwrap_err();
    assert!(matches!(err, StepwrightError::Parse(_)));
    assert!(page.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_replay_copies_recording() {
    let page = Arc::new(ScriptedPage::new());
    let (agent, llm) = agent_with("", &page);

    let session = RecordingSession::new("Search")
        .with_action(RecordedAction::new("navigate", "Open", "").with_value("https://x.test"))
        .with_action(RecordedAction::new("input", "Type query", "#q").with_value("hi"))
        .with_action(RecordedAction::new("click", "", "#go"));

    let result = agent.replay(&session).await.unwrap();
    assert!(result.success);
    assert_eq!(
        page.trace(),
        vec!["navigate https://x.test/", "type #q", "click #go"]
    );
    assert_eq!(llm.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_replay_of_empty_session_is_rejected() {
    let page = Arc::new(ScriptedPage::new());
    let (agent, _) = agent_with("", &page);

    let err = agent
        .replay(&RecordingSession::new("Nothing"))
        .await
        .unwrap_err();
    assert!(matches!(err, StepwrightError::NoValidSteps(_)));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_planning_runs_no_step() {
    let page = Arc::new(ScriptedPage::new());
    let llm = Arc::new(
        ScriptedLlm::new(
            r##"[{"action":"click","target":"#a","description":"A"},{"action":"click","target":"#b","description":"B"}]"##,
        )
        .with_delay(Duration::from_secs(5)),
    );
    let agent = Arc::new(Agent::new(test_config(), llm.clone(), page.clone()));

    let runner = Arc::clone(&agent);
    let run = tokio::spawn(async move {
        let session = search_session();
        runner.automate(&session).await
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(llm.calls(), 1);
    agent.cancel();

    let result = run.await.unwrap().unwrap();
    assert!(result.cancelled);
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some(CANCELLED_REASON));
    assert_eq!(result.steps.len(), 2);
    assert!(result.steps.iter().all(|s| s.status == StepStatus::Pending));
    assert!(page.calls().is_empty());

    // A later operation is not affected by the earlier cancel
    let result = agent.automate(&search_session()).await.unwrap();
    assert!(result.success);
    assert_eq!(page.trace(), vec!["click #a", "click #b"]);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_replay_leaves_rest_pending() {
    let page = Arc::new(ScriptedPage::new());
    let (sender, mut events) = progress_channel();
    let (agent, _) = agent_with("", &page);
    let agent = Arc::new(agent.with_progress(sender));

    let session = RecordingSession::new("Three clicks")
        .with_action(RecordedAction::new("click", "First", "#one"))
        .with_action(RecordedAction::new("click", "Second", "#two"))
        .with_action(RecordedAction::new("click", "Third", "#three"));

    let runner = Arc::clone(&agent);
    let run = tokio::spawn(async move { runner.replay(&session).await });

    while let Some(event) = events.next().await {
        if let ProgressEvent::StepComplete { step_index: 0, .. } = event {
            agent.cancel();
            break;
        }
    }

    let result = run.await.unwrap().unwrap();
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some(CANCELLED_REASON));
    assert_eq!(result.steps[0].status, StepStatus::Completed);
    assert_eq!(result.steps[1].status, StepStatus::Pending);
    assert_eq!(result.steps[2].status, StepStatus::Pending);
    assert_eq!(page.attempts("#two"), 0);
}
