//! Test doubles shared by the integration tests
//!
//! `ScriptedPage` is an in-memory page handle that records every call and
//! fails on demand; `ScriptedLlm` answers every request with a fixed text.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use stepwright::core::config::ExecutionConfig;
use stepwright::core::{ActionKind, ExecuteStep};
use stepwright::llm::{ChatMessage, GenerateOptions, LLMProvider, LLMResponse};
use stepwright::page::{PageError, PageHandle, PageResult, PageSnapshot, ScrollTarget};

/// Fast, deterministic execution settings for the paused clock
pub fn test_execution_config() -> ExecutionConfig {
    ExecutionConfig {
        max_retries: 3,
        step_timeout_ms: 30_000,
        inter_step_delay_ms: 1_000,
        backoff_base_ms: 500,
        backoff_multiplier: 2.0,
        backoff_max_ms: 10_000,
        bootstrap_steps: 1,
        abort_on_first_navigate: true,
        element_timeout_ms: 10_000,
        dynamic_content_timeout_ms: 5_000,
    }
}

pub fn step(index: usize, action: ActionKind, target: &str, max_retries: u32) -> ExecuteStep {
    ExecuteStep::new(
        format!("step-{}", index),
        action,
        format!("{} {}", action.label(), target),
        target,
        max_retries,
    )
}

#[derive(Debug, Clone)]
pub struct Call {
    pub op: &'static str,
    pub target: String,
    pub value: Option<String>,
    pub at: Instant,
}

enum Fault {
    /// Fail this many more times, then succeed
    Times(usize, PageError),
    Always(PageError),
}

/// In-memory page handle
pub struct ScriptedPage {
    calls: Mutex<Vec<Call>>,
    faults: Mutex<HashMap<String, Fault>>,
    delays: Mutex<HashMap<String, Duration>>,
    url: Mutex<String>,
    clipboard: Mutex<String>,
}

impl Default for ScriptedPage {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedPage {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            faults: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
            url: Mutex::new("about:blank".to_string()),
            clipboard: Mutex::new(String::new()),
        }
    }

    /// Soft-fail every operation on `target`
    pub fn failing(self, target: &str) -> Self {
        self.fault(
            target,
            Fault::Always(PageError::ElementNotFound(target.to_string())),
        )
    }

    /// Soft-fail the first `times` operations on `target`
    pub fn flaky(self, target: &str, times: usize) -> Self {
        self.fault(
            target,
            Fault::Times(times, PageError::ElementNotFound(target.to_string())),
        )
    }

    /// Report the page as gone when `target` is touched
    pub fn fatal_on(self, target: &str) -> Self {
        self.fault(
            target,
            Fault::Always(PageError::Disconnected("browser closed".to_string())),
        )
    }

    /// Take `delay` before answering operations on `target`
    pub fn slow(self, target: &str, delay: Duration) -> Self {
        self.delays
            .lock()
            .unwrap()
            .insert(target.to_string(), delay);
        self
    }

    fn fault(self, target: &str, fault: Fault) -> Self {
        self.faults
            .lock()
            .unwrap()
            .insert(target.to_string(), fault);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// `"op target"` for every call, in order
    pub fn trace(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| format!("{} {}", c.op, c.target))
            .collect()
    }

    pub fn attempts(&self, target: &str) -> usize {
        self.calls().iter().filter(|c| c.target == target).count()
    }

    /// Time of every call touching `target`
    pub fn call_times(&self, target: &str) -> Vec<Instant> {
        self.calls()
            .iter()
            .filter(|c| c.target == target)
            .map(|c| c.at)
            .collect()
    }

    async fn record(&self, op: &'static str, target: &str, value: Option<&str>) -> PageResult<()> {
        self.calls.lock().unwrap().push(Call {
            op,
            target: target.to_string(),
            value: value.map(str::to_string),
            at: Instant::now(),
        });

        let delay = self.delays.lock().unwrap().get(target).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.check_fault(target)
    }

    /// Apply the fault registered for `target` without recording a call
    fn check_fault(&self, target: &str) -> PageResult<()> {
        let mut faults = self.faults.lock().unwrap();
        match faults.get_mut(target) {
            Some(Fault::Always(error)) => Err(error.clone()),
            Some(Fault::Times(remaining, error)) if *remaining > 0 => {
                *remaining -= 1;
                Err(error.clone())
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl PageHandle for ScriptedPage {
    async fn navigate(&self, url: &str) -> PageResult<()> {
        self.record("navigate", url, None).await?;
        *self.url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn click(&self, selector: &str) -> PageResult<()> {
        self.record("click", selector, None).await
    }

    async fn type_text(&self, selector: &str, text: &str) -> PageResult<()> {
        self.record("type", selector, Some(text)).await
    }

    async fn focus(&self, selector: &str) -> PageResult<()> {
        self.record("focus", selector, None).await
    }

    async fn blur(&self, selector: &str) -> PageResult<()> {
        self.record("blur", selector, None).await
    }

    async fn hover(&self, selector: &str) -> PageResult<()> {
        self.record("hover", selector, None).await
    }

    async fn keypress(&self, selector: Option<&str>, key: &str) -> PageResult<()> {
        self.record("keypress", selector.unwrap_or("page"), Some(key)).await
    }

    async fn select_option(&self, selector: &str, value: &str) -> PageResult<()> {
        self.record("select", selector, Some(value)).await
    }

    async fn toggle_checkbox(&self, selector: &str, checked: Option<bool>) -> PageResult<()> {
        let value = checked.map(|c| c.to_string());
        self.record("toggle", selector, value.as_deref()).await
    }

    async fn select_radio(&self, selector: &str) -> PageResult<()> {
        self.record("radio", selector, None).await
    }

    async fn select_file(&self, selector: &str, path: &str) -> PageResult<()> {
        self.record("file", selector, Some(path)).await
    }

    async fn adjust_slider(&self, selector: &str, value: f64) -> PageResult<()> {
        self.record("slider", selector, Some(&value.to_string())).await
    }

    async fn copy(&self, selector: &str) -> PageResult<String> {
        self.record("copy", selector, None).await?;
        let text = format!("text of {}", selector);
        *self.clipboard.lock().unwrap() = text.clone();
        Ok(text)
    }

    async fn cut(&self, selector: &str) -> PageResult<String> {
        self.record("cut", selector, None).await?;
        let text = format!("text of {}", selector);
        *self.clipboard.lock().unwrap() = text.clone();
        Ok(text)
    }

    async fn paste(&self, selector: &str) -> PageResult<String> {
        self.record("paste", selector, None).await?;
        Ok(self.clipboard.lock().unwrap().clone())
    }

    async fn scroll(&self, target: &ScrollTarget, amount: Option<u32>) -> PageResult<()> {
        let amount = amount.map(|a| a.to_string());
        self.record("scroll", &target.to_string(), amount.as_deref()).await
    }

    async fn context_menu(&self, selector: &str) -> PageResult<()> {
        self.record("context_menu", selector, None).await
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> PageResult<()> {
        self.record("wait_for", selector, None).await
    }

    async fn wait_for_dynamic_content(&self, _timeout: Duration) -> PageResult<()> {
        self.record("wait_dynamic", "page", None).await
    }

    async fn verify_element(&self, selector: &str) -> PageResult<bool> {
        self.record("verify_element", selector, None).await?;
        Ok(true)
    }

    async fn verify_text(&self, selector: Option<&str>, text: &str) -> PageResult<bool> {
        self.record("verify_text", selector.unwrap_or("page"), Some(text)).await?;
        Ok(true)
    }

    async fn current_url(&self) -> PageResult<String> {
        self.check_fault("current_url")?;
        Ok(self.url.lock().unwrap().clone())
    }

    async fn verify_url(&self, expected: &str) -> PageResult<bool> {
        self.record("verify_url", expected, None).await?;
        Ok(self.url.lock().unwrap().contains(expected))
    }

    async fn extract(&self, selector: Option<&str>) -> PageResult<PageSnapshot> {
        let target = selector.unwrap_or("page");
        self.record("extract", target, None).await?;
        Ok(PageSnapshot {
            url: self.url.lock().unwrap().clone(),
            title: "Scripted".to_string(),
            text: Some(format!("content of {}", target)),
            ..Default::default()
        })
    }

    async fn execute_script(&self, script: &str) -> PageResult<serde_json::Value> {
        self.record("script", script, None).await?;
        Ok(serde_json::Value::String("ok".to_string()))
    }
}

/// LLM double answering every request with `response`
pub struct ScriptedLlm {
    response: String,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_user_prompt: Mutex<Option<String>>,
}

impl ScriptedLlm {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            delay: None,
            calls: AtomicUsize::new(0),
            last_user_prompt: Mutex::new(None),
        }
    }

    /// Take `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_user_prompt(&self) -> Option<String> {
        self.last_user_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedLlm {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        _options: Option<GenerateOptions>,
    ) -> stepwright::Result<LLMResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(user) = messages.iter().rev().find(|m| m.role == "user") {
            *self.last_user_prompt.lock().unwrap() = Some(user.content.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(LLMResponse {
            content: self.response.clone(),
            usage: None,
            model: "scripted".to_string(),
        })
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
