//! Clipboard strategies
//!
//! The clipboard lives in the page handle, so copy and paste steps of one run
//! share it.

use async_trait::async_trait;
use serde_json::json;

use crate::core::{ActionKind, ActionResult, ExecuteStep};
use crate::page::{PageError, PageHandle, PageResult};
use crate::strategies::{required_target, PageStrategy};

pub struct ClipboardStrategy {
    kind: ActionKind,
}

impl ClipboardStrategy {
    pub fn new(kind: ActionKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl PageStrategy for ClipboardStrategy {
    async fn run(&self, step: &ExecuteStep, page: &dyn PageHandle) -> PageResult<ActionResult> {
        let selector = required_target(step)?;
        let (verb, text) = match self.kind {
            ActionKind::Copy => ("Copied from", page.copy(selector).await?),
            ActionKind::Cut => ("Cut from", page.cut(selector).await?),
            ActionKind::Paste => ("Pasted into", page.paste(selector).await?),
            other => {
                return Err(PageError::Other(format!(
                    "Clipboard strategy cannot perform '{}'",
                    other
                )))
            }
        };
        Ok(ActionResult::success_with_data(
            format!("{} {}", verb, selector),
            json!({ "text": text }),
        ))
    }
}
