//! Verification and extraction strategies
//!
//! A verification that observes the wrong state is a soft failure, so it is
//! retried like any other step.

use async_trait::async_trait;

use crate::core::{ActionResult, ExecuteStep};
use crate::page::{PageError, PageHandle, PageResult};
use crate::strategies::{required_target, required_value, PageStrategy};

pub struct VerifyElementStrategy;

#[async_trait]
impl PageStrategy for VerifyElementStrategy {
    async fn run(&self, step: &ExecuteStep, page: &dyn PageHandle) -> PageResult<ActionResult> {
        let selector = required_target(step)?;
        if !page.verify_element(selector).await? {
            return Err(PageError::Verification(format!("element {} not present", selector)));
        }
        Ok(ActionResult::success(format!("Element {} present", selector)))
    }
}

pub struct VerifyTextStrategy;

#[async_trait]
impl PageStrategy for VerifyTextStrategy {
    async fn run(&self, step: &ExecuteStep, page: &dyn PageHandle) -> PageResult<ActionResult> {
        let text = required_value(step, "Expected text")?;
        let scope = step.target();
        if !page.verify_text(scope, text).await? {
            return Err(PageError::Verification(format!(
                "text '{}' not found in {}",
                text,
                scope.unwrap_or("page")
            )));
        }
        Ok(ActionResult::success(format!("Text '{}' present", text)))
    }
}

pub struct VerifyUrlStrategy;

#[async_trait]
impl PageStrategy for VerifyUrlStrategy {
    async fn run(&self, step: &ExecuteStep, page: &dyn PageHandle) -> PageResult<ActionResult> {
        let expected = step
            .value()
            .or_else(|| step.target())
            .ok_or_else(|| PageError::Other("Expected URL required".to_string()))?;
        if !page.verify_url(expected).await? {
            let actual = match page.current_url().await {
                Ok(url) => url,
                Err(e) if e.is_fatal() => return Err(e),
                Err(_) => String::from("unknown"),
            };
            return Err(PageError::Verification(format!(
                "URL '{}' does not contain '{}'",
                actual, expected
            )));
        }
        Ok(ActionResult::success(format!("URL matches {}", expected)))
    }
}

/// Returns the page snapshot as the step's data
pub struct ExtractStrategy;

#[async_trait]
impl PageStrategy for ExtractStrategy {
    async fn run(&self, step: &ExecuteStep, page: &dyn PageHandle) -> PageResult<ActionResult> {
        let snapshot = page.extract(step.target()).await?;
        let data = serde_json::to_value(&snapshot)
            .map_err(|e| PageError::Other(format!("Snapshot not serializable: {}", e)))?;
        Ok(ActionResult::success_with_data(
            format!("Extracted content from {}", snapshot.url),
            data,
        ))
    }
}
