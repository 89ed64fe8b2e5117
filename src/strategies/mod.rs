//! Strategies module - one executable operation per action kind
//!
//! `StrategyRegistry` is the dispatch table from `ActionKind` to an
//! `ActionStrategy`. Strategies turn soft page failures into a failed
//! `ActionResult` and let only fatal ones escape as errors.

pub mod clipboard;
pub mod form;
pub mod interaction;
pub mod navigation;
pub mod verify;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::core::config::ExecutionConfig;
use crate::core::{ActionKind, ActionResult, ExecuteStep, Result, StepwrightError};
use crate::page::{PageError, PageHandle, PageResult};

use self::clipboard::ClipboardStrategy;
use self::form::{
    AdjustSliderStrategy, ClearStrategy, SelectFileStrategy, SelectOptionStrategy,
    SelectRadioStrategy, SubmitStrategy, ToggleStrategy, TypeStrategy,
};
use self::interaction::{KeypressStrategy, PointerStrategy, ScrollStrategy};
use self::navigation::{
    NavigateStrategy, WaitForDynamicContentStrategy, WaitForElementStrategy, WaitStrategy,
};
use self::verify::{ExtractStrategy, VerifyElementStrategy, VerifyTextStrategy, VerifyUrlStrategy};

/// Executable operation bound to an action kind
///
/// Re-running a strategy with the same step must be safe: the runner retries
/// failed attempts.
#[async_trait]
pub trait ActionStrategy: Send + Sync {
    /// Run the step against the page
    ///
    /// Soft failures come back as `Ok` with `success == false`; `Err` means
    /// the run cannot continue.
    async fn execute(&self, step: &ExecuteStep, page: &dyn PageHandle) -> Result<ActionResult>;
}

/// Strategy written purely against the page handle
///
/// Every implementor is an `ActionStrategy`: its `PageError`s are folded
/// through [`absorb`].
#[async_trait]
pub trait PageStrategy: Send + Sync {
    async fn run(&self, step: &ExecuteStep, page: &dyn PageHandle) -> PageResult<ActionResult>;
}

#[async_trait]
impl<T: PageStrategy> ActionStrategy for T {
    async fn execute(&self, step: &ExecuteStep, page: &dyn PageHandle) -> Result<ActionResult> {
        absorb(self.run(step, page).await)
    }
}

/// Fold a page outcome into the strategy contract
pub fn absorb(outcome: PageResult<ActionResult>) -> Result<ActionResult> {
    match outcome {
        Ok(result) => Ok(result),
        Err(e) if e.is_fatal() => Err(StepwrightError::fatal(e.to_string())),
        Err(e) => Ok(ActionResult::failure(e.to_string())),
    }
}

/// The step's selector, or a soft failure when it has none
pub(crate) fn required_target(step: &ExecuteStep) -> PageResult<&str> {
    step.target()
        .ok_or_else(|| PageError::Other("Target selector required".to_string()))
}

/// The step's value, or a soft failure naming what is missing
pub(crate) fn required_value<'a>(step: &'a ExecuteStep, what: &str) -> PageResult<&'a str> {
    step.value()
        .ok_or_else(|| PageError::Other(format!("{} required", what)))
}

/// Dispatch table from action kind to strategy
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<ActionKind, Arc<dyn ActionStrategy>>,
}

impl StrategyRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a strategy for every action kind
    pub fn with_defaults(config: &ExecutionConfig) -> Self {
        let element_timeout = config.element_timeout();
        let dynamic_timeout = config.dynamic_content_timeout();

        let mut registry = Self::new();
        registry.register(ActionKind::Navigate, NavigateStrategy);
        registry.register(ActionKind::Wait, WaitStrategy);
        registry.register(
            ActionKind::WaitForElement,
            WaitForElementStrategy::new(element_timeout),
        );
        registry.register(
            ActionKind::WaitForDynamicContent,
            WaitForDynamicContentStrategy::new(dynamic_timeout),
        );

        for kind in [
            ActionKind::Click,
            ActionKind::Focus,
            ActionKind::Blur,
            ActionKind::Hover,
            ActionKind::ContextMenu,
        ] {
            registry.register(kind, PointerStrategy::new(kind));
        }
        registry.register(ActionKind::Keypress, KeypressStrategy);
        registry.register(ActionKind::Scroll, ScrollStrategy);

        registry.register(ActionKind::Type, TypeStrategy);
        registry.register(ActionKind::Clear, ClearStrategy);
        registry.register(ActionKind::Submit, SubmitStrategy);
        registry.register(ActionKind::Select, SelectOptionStrategy);
        registry.register(ActionKind::SelectOption, SelectOptionStrategy);
        registry.register(ActionKind::Toggle, ToggleStrategy);
        registry.register(ActionKind::SelectRadio, SelectRadioStrategy);
        registry.register(ActionKind::SelectFile, SelectFileStrategy);
        registry.register(ActionKind::AdjustSlider, AdjustSliderStrategy);

        for kind in [ActionKind::Copy, ActionKind::Cut, ActionKind::Paste] {
            registry.register(kind, ClipboardStrategy::new(kind));
        }

        registry.register(ActionKind::VerifyElement, VerifyElementStrategy);
        registry.register(ActionKind::VerifyText, VerifyTextStrategy);
        registry.register(ActionKind::VerifyUrl, VerifyUrlStrategy);
        registry.register(ActionKind::Extract, ExtractStrategy);

        registry
    }

    /// Bind `strategy` to `kind`, replacing any earlier binding
    pub fn register(&mut self, kind: ActionKind, strategy: impl ActionStrategy + 'static) {
        self.strategies.insert(kind, Arc::new(strategy));
    }

    /// Remove the binding for `kind`
    pub fn unregister(&mut self, kind: ActionKind) -> bool {
        self.strategies.remove(&kind).is_some()
    }

    /// Look up the strategy for `kind`; unregistered kinds fail fast
    pub fn create_strategy(&self, kind: ActionKind) -> Result<Arc<dyn ActionStrategy>> {
        self.strategies
            .get(&kind)
            .cloned()
            .ok_or(StepwrightError::NoStrategy(kind))
    }

    /// Fail on the first action kind without a strategy
    pub fn ensure_complete(&self) -> Result<()> {
        match ActionKind::ALL
            .into_iter()
            .find(|kind| !self.strategies.contains_key(kind))
        {
            Some(kind) => Err(StepwrightError::NoStrategy(kind)),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

/// Parse a millisecond count from a step value
pub(crate) fn millis(value: &str) -> Option<Duration> {
    crate::plan::validate::parse_number(value).map(|ms| Duration::from_millis(ms.round() as u64))
}
