//! Form strategies: text entry, choices, files and sliders

use async_trait::async_trait;

use crate::core::{ActionResult, ExecuteStep};
use crate::page::{PageError, PageHandle, PageResult};
use crate::plan::validate::parse_number;
use crate::strategies::{required_target, required_value, PageStrategy};

/// Replaces the field content, so a retry never duplicates text
pub struct TypeStrategy;

#[async_trait]
impl PageStrategy for TypeStrategy {
    async fn run(&self, step: &ExecuteStep, page: &dyn PageHandle) -> PageResult<ActionResult> {
        let selector = required_target(step)?;
        let text = step
            .value
            .as_deref()
            .ok_or_else(|| PageError::Other("Text value required".to_string()))?;
        page.type_text(selector, text).await?;
        Ok(ActionResult::success(format!("Typed into {}", selector)))
    }
}

pub struct ClearStrategy;

#[async_trait]
impl PageStrategy for ClearStrategy {
    async fn run(&self, step: &ExecuteStep, page: &dyn PageHandle) -> PageResult<ActionResult> {
        let selector = required_target(step)?;
        page.clear(selector).await?;
        Ok(ActionResult::success(format!("Cleared {}", selector)))
    }
}

pub struct SubmitStrategy;

#[async_trait]
impl PageStrategy for SubmitStrategy {
    async fn run(&self, step: &ExecuteStep, page: &dyn PageHandle) -> PageResult<ActionResult> {
        let selector = required_target(step)?;
        page.submit(selector).await?;
        Ok(ActionResult::success(format!("Submitted form of {}", selector)))
    }
}

/// Serves both `select` and `select_option`
pub struct SelectOptionStrategy;

#[async_trait]
impl PageStrategy for SelectOptionStrategy {
    async fn run(&self, step: &ExecuteStep, page: &dyn PageHandle) -> PageResult<ActionResult> {
        let selector = required_target(step)?;
        let option = required_value(step, "Option value")?;
        page.select_option(selector, option).await?;
        Ok(ActionResult::success(format!("Selected '{}' in {}", option, selector)))
    }
}

/// Explicit state when the value says so, otherwise a flip
pub struct ToggleStrategy;

fn parse_checked(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" | "checked" | "check" => Some(true),
        "false" | "off" | "no" | "0" | "unchecked" | "uncheck" => Some(false),
        _ => None,
    }
}

#[async_trait]
impl PageStrategy for ToggleStrategy {
    async fn run(&self, step: &ExecuteStep, page: &dyn PageHandle) -> PageResult<ActionResult> {
        let selector = required_target(step)?;
        let checked = step.value().and_then(parse_checked);
        page.toggle_checkbox(selector, checked).await?;
        let message = match checked {
            Some(true) => format!("Checked {}", selector),
            Some(false) => format!("Unchecked {}", selector),
            None => format!("Toggled {}", selector),
        };
        Ok(ActionResult::success(message))
    }
}

pub struct SelectRadioStrategy;

#[async_trait]
impl PageStrategy for SelectRadioStrategy {
    async fn run(&self, step: &ExecuteStep, page: &dyn PageHandle) -> PageResult<ActionResult> {
        let selector = required_target(step)?;
        page.select_radio(selector).await?;
        Ok(ActionResult::success(format!("Selected radio {}", selector)))
    }
}

pub struct SelectFileStrategy;

#[async_trait]
impl PageStrategy for SelectFileStrategy {
    async fn run(&self, step: &ExecuteStep, page: &dyn PageHandle) -> PageResult<ActionResult> {
        let selector = required_target(step)?;
        let path = required_value(step, "File path")?;
        page.select_file(selector, path).await?;
        Ok(ActionResult::success(format!("Attached {} to {}", path, selector)))
    }
}

pub struct AdjustSliderStrategy;

#[async_trait]
impl PageStrategy for AdjustSliderStrategy {
    async fn run(&self, step: &ExecuteStep, page: &dyn PageHandle) -> PageResult<ActionResult> {
        let selector = required_target(step)?;
        let value = step
            .value()
            .and_then(parse_number)
            .ok_or_else(|| PageError::Other("Numeric value required".to_string()))?;
        page.adjust_slider(selector, value).await?;
        Ok(ActionResult::success(format!("Set {} to {}", selector, value)))
    }
}
