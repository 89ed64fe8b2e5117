//! Pointer, keyboard and scroll strategies

use async_trait::async_trait;

use crate::core::{ActionKind, ActionResult, ExecuteStep};
use crate::page::{PageError, PageHandle, PageResult, ScrollTarget};
use crate::strategies::{required_target, required_value, PageStrategy};

/// Single-selector pointer actions: click, focus, blur, hover, context menu
pub struct PointerStrategy {
    kind: ActionKind,
}

impl PointerStrategy {
    pub fn new(kind: ActionKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl PageStrategy for PointerStrategy {
    async fn run(&self, step: &ExecuteStep, page: &dyn PageHandle) -> PageResult<ActionResult> {
        let selector = required_target(step)?;
        let verb = match self.kind {
            ActionKind::Click => {
                page.click(selector).await?;
                "Clicked"
            }
            ActionKind::Focus => {
                page.focus(selector).await?;
                "Focused"
            }
            ActionKind::Blur => {
                page.blur(selector).await?;
                "Blurred"
            }
            ActionKind::Hover => {
                page.hover(selector).await?;
                "Hovered over"
            }
            ActionKind::ContextMenu => {
                page.context_menu(selector).await?;
                "Opened context menu on"
            }
            other => {
                return Err(PageError::Other(format!(
                    "Pointer strategy cannot perform '{}'",
                    other
                )))
            }
        };
        Ok(ActionResult::success(format!("{} {}", verb, selector)))
    }
}

pub struct KeypressStrategy;

#[async_trait]
impl PageStrategy for KeypressStrategy {
    async fn run(&self, step: &ExecuteStep, page: &dyn PageHandle) -> PageResult<ActionResult> {
        let key = required_value(step, "Key value")?;
        page.keypress(step.target(), key).await?;
        Ok(ActionResult::success(format!("Pressed {}", key)))
    }
}

pub struct ScrollStrategy;

#[async_trait]
impl PageStrategy for ScrollStrategy {
    async fn run(&self, step: &ExecuteStep, page: &dyn PageHandle) -> PageResult<ActionResult> {
        let target = ScrollTarget::parse(step.target().unwrap_or_default());
        let amount = step
            .value()
            .and_then(crate::plan::validate::parse_number)
            .map(|px| px.round() as u32);
        page.scroll(&target, amount).await?;
        Ok(ActionResult::success(format!("Scrolled {}", target)))
    }
}
