//! Navigation and waiting strategies

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::core::{ActionResult, ExecuteStep};
use crate::page::{PageError, PageHandle, PageResult};
use crate::strategies::{millis, required_target, required_value, PageStrategy};

/// Turn planner output into an absolute URL
///
/// Bare hosts such as `example.com/login` get an `https://` scheme.
pub fn normalize_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(url) = Url::parse(raw) {
        if matches!(url.scheme(), "http" | "https" | "file" | "about" | "data") {
            return Some(url.to_string());
        }
    }

    Url::parse(&format!("https://{}", raw))
        .ok()
        .filter(|url| {
            url.host_str()
                .map(|host| host.contains('.') || host == "localhost")
                .unwrap_or(false)
        })
        .map(|url| url.to_string())
}

pub struct NavigateStrategy;

#[async_trait]
impl PageStrategy for NavigateStrategy {
    async fn run(&self, step: &ExecuteStep, page: &dyn PageHandle) -> PageResult<ActionResult> {
        let raw = step
            .target()
            .or_else(|| step.value())
            .ok_or_else(|| PageError::Navigation("URL is required".to_string()))?;
        let url = normalize_url(raw)
            .ok_or_else(|| PageError::Navigation(format!("Invalid URL '{}'", raw)))?;

        debug!(step_id = %step.id, %url, "Navigating");
        page.navigate(&url).await?;
        Ok(ActionResult::success(format!("Navigated to {}", url)))
    }
}

pub struct WaitStrategy;

#[async_trait]
impl PageStrategy for WaitStrategy {
    async fn run(&self, step: &ExecuteStep, page: &dyn PageHandle) -> PageResult<ActionResult> {
        let value = required_value(step, "Numeric value")?;
        let ms = millis(value)
            .ok_or_else(|| PageError::Other("Numeric value required".to_string()))?
            .as_millis() as u64;
        page.wait_millis(ms).await?;
        Ok(ActionResult::success(format!("Waited {}ms", ms)))
    }
}

pub struct WaitForElementStrategy {
    default_timeout: Duration,
}

impl WaitForElementStrategy {
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }
}

#[async_trait]
impl PageStrategy for WaitForElementStrategy {
    async fn run(&self, step: &ExecuteStep, page: &dyn PageHandle) -> PageResult<ActionResult> {
        let selector = required_target(step)?;
        let timeout = step.value().and_then(millis).unwrap_or(self.default_timeout);
        page.wait_for_selector(selector, timeout).await?;
        Ok(ActionResult::success(format!("Element {} is present", selector)))
    }
}

pub struct WaitForDynamicContentStrategy {
    default_timeout: Duration,
}

impl WaitForDynamicContentStrategy {
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }
}

#[async_trait]
impl PageStrategy for WaitForDynamicContentStrategy {
    async fn run(&self, step: &ExecuteStep, page: &dyn PageHandle) -> PageResult<ActionResult> {
        let timeout = step.value().and_then(millis).unwrap_or(self.default_timeout);
        page.wait_for_dynamic_content(timeout).await?;
        Ok(ActionResult::success("Page content settled"))
    }
}
