//! Shared types used across Stepwright modules
//!
//! Contains the action vocabulary, executable steps and run results.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of actions the execution engine knows how to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Navigate,
    Click,
    Type,
    Clear,
    Submit,
    Focus,
    Blur,
    Hover,
    Keypress,
    Select,
    Toggle,
    SelectOption,
    SelectRadio,
    SelectFile,
    AdjustSlider,
    Copy,
    Cut,
    Paste,
    Scroll,
    ContextMenu,
    Wait,
    WaitForElement,
    WaitForDynamicContent,
    VerifyElement,
    VerifyText,
    VerifyUrl,
    Extract,
}

impl ActionKind {
    /// Every action kind, in declaration order
    pub const ALL: [ActionKind; 27] = [
        ActionKind::Navigate,
        ActionKind::Click,
        ActionKind::Type,
        ActionKind::Clear,
        ActionKind::Submit,
        ActionKind::Focus,
        ActionKind::Blur,
        ActionKind::Hover,
        ActionKind::Keypress,
        ActionKind::Select,
        ActionKind::Toggle,
        ActionKind::SelectOption,
        ActionKind::SelectRadio,
        ActionKind::SelectFile,
        ActionKind::AdjustSlider,
        ActionKind::Copy,
        ActionKind::Cut,
        ActionKind::Paste,
        ActionKind::Scroll,
        ActionKind::ContextMenu,
        ActionKind::Wait,
        ActionKind::WaitForElement,
        ActionKind::WaitForDynamicContent,
        ActionKind::VerifyElement,
        ActionKind::VerifyText,
        ActionKind::VerifyUrl,
        ActionKind::Extract,
    ];

    /// Canonical wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Navigate => "navigate",
            ActionKind::Click => "click",
            ActionKind::Type => "type",
            ActionKind::Clear => "clear",
            ActionKind::Submit => "submit",
            ActionKind::Focus => "focus",
            ActionKind::Blur => "blur",
            ActionKind::Hover => "hover",
            ActionKind::Keypress => "keypress",
            ActionKind::Select => "select",
            ActionKind::Toggle => "toggle",
            ActionKind::SelectOption => "select_option",
            ActionKind::SelectRadio => "select_radio",
            ActionKind::SelectFile => "select_file",
            ActionKind::AdjustSlider => "adjust_slider",
            ActionKind::Copy => "copy",
            ActionKind::Cut => "cut",
            ActionKind::Paste => "paste",
            ActionKind::Scroll => "scroll",
            ActionKind::ContextMenu => "context_menu",
            ActionKind::Wait => "wait",
            ActionKind::WaitForElement => "wait_for_element",
            ActionKind::WaitForDynamicContent => "wait_for_dynamic_content",
            ActionKind::VerifyElement => "verify_element",
            ActionKind::VerifyText => "verify_text",
            ActionKind::VerifyUrl => "verify_url",
            ActionKind::Extract => "extract",
        }
    }

    /// Short usage hint shown to the LLM in the plan prompt
    pub fn usage(&self) -> &'static str {
        match self {
            ActionKind::Navigate => "target = absolute URL",
            ActionKind::Click => "target = CSS selector",
            ActionKind::Type => "target = input selector, value = text to type",
            ActionKind::Clear => "target = input selector",
            ActionKind::Submit => "target = form or field selector",
            ActionKind::Focus => "target = selector",
            ActionKind::Blur => "target = selector",
            ActionKind::Hover => "target = selector",
            ActionKind::Keypress => "value = key name (Enter, Tab, Escape...), target optional",
            ActionKind::Select => "target = select selector, value = option",
            ActionKind::Toggle => "target = checkbox selector, value = true/false (optional)",
            ActionKind::SelectOption => "target = select selector, value = option value or label",
            ActionKind::SelectRadio => "target = radio input selector",
            ActionKind::SelectFile => "target = file input selector, value = file path",
            ActionKind::AdjustSlider => "target = range input selector, value = number",
            ActionKind::Copy => "target = selector whose text/value is copied",
            ActionKind::Cut => "target = input selector whose value is cut",
            ActionKind::Paste => "target = input selector receiving the clipboard",
            ActionKind::Scroll => "target = selector or up/down/top/bottom, value = pixels (optional)",
            ActionKind::ContextMenu => "target = selector",
            ActionKind::Wait => "value = milliseconds",
            ActionKind::WaitForElement => "target = selector, value = timeout ms (optional)",
            ActionKind::WaitForDynamicContent => "value = timeout ms (optional)",
            ActionKind::VerifyElement => "target = selector expected to exist",
            ActionKind::VerifyText => "value = expected text, target = selector (optional)",
            ActionKind::VerifyUrl => "value = expected URL or fragment",
            ActionKind::Extract => "target = selector (optional), returns page content",
        }
    }

    /// Human label used when a description has to be synthesized
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Navigate => "Navigate to",
            ActionKind::Click => "Click",
            ActionKind::Type => "Type into",
            ActionKind::Clear => "Clear",
            ActionKind::Submit => "Submit",
            ActionKind::Focus => "Focus",
            ActionKind::Blur => "Blur",
            ActionKind::Hover => "Hover over",
            ActionKind::Keypress => "Press key",
            ActionKind::Select | ActionKind::SelectOption => "Select option in",
            ActionKind::Toggle => "Toggle",
            ActionKind::SelectRadio => "Select radio",
            ActionKind::SelectFile => "Attach file to",
            ActionKind::AdjustSlider => "Adjust slider",
            ActionKind::Copy => "Copy from",
            ActionKind::Cut => "Cut from",
            ActionKind::Paste => "Paste into",
            ActionKind::Scroll => "Scroll",
            ActionKind::ContextMenu => "Open context menu on",
            ActionKind::Wait => "Wait",
            ActionKind::WaitForElement => "Wait for element",
            ActionKind::WaitForDynamicContent => "Wait for dynamic content",
            ActionKind::VerifyElement => "Verify element",
            ActionKind::VerifyText => "Verify text",
            ActionKind::VerifyUrl => "Verify URL",
            ActionKind::Extract => "Extract content",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parsing of the canonical wire name; synonyms live in `plan::normalize`
impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ActionKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown action type '{}'", s))
    }
}

/// Lifecycle of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl StepStatus {
    /// Completed or failed
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed)
    }

    /// Position in the pending -> running -> terminal order
    pub fn rank(&self) -> u8 {
        match self {
            StepStatus::Pending => 0,
            StepStatus::Running => 1,
            StepStatus::Completed | StepStatus::Failed => 2,
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Pending => write!(f, "pending"),
            StepStatus::Running => write!(f, "running"),
            StepStatus::Completed => write!(f, "completed"),
            StepStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A single validated, typed action in an execution plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteStep {
    /// Stable ordering key
    pub id: String,
    pub action: ActionKind,
    pub description: String,
    /// Selector or URL; empty when the action does not need one
    #[serde(default)]
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Free text from the planner, never acted upon
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub status: StepStatus,
    pub max_retries: u32,
    #[serde(default)]
    pub retry_count: u32,
}

impl ExecuteStep {
    /// Create a pending step
    pub fn new(
        id: impl Into<String>,
        action: ActionKind,
        description: impl Into<String>,
        target: impl Into<String>,
        max_retries: u32,
    ) -> Self {
        Self {
            id: id.into(),
            action,
            description: description.into(),
            target: target.into(),
            value: None,
            reasoning: None,
            status: StepStatus::Pending,
            max_retries,
            retry_count: 0,
        }
    }

    /// Set the value payload
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Trimmed target, `None` when blank
    pub fn target(&self) -> Option<&str> {
        let target = self.target.trim();
        (!target.is_empty()).then_some(target)
    }

    /// Trimmed value, `None` when missing or blank
    pub fn value(&self) -> Option<&str> {
        self.value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// One-line label for progress output
    pub fn label(&self) -> String {
        format!("{}: {}", self.action, self.description)
    }
}

/// Outcome of a single strategy invocation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Structured payload, e.g. extracted text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    /// Create a successful result
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            error: None,
        }
    }

    /// Create a successful result with structured data
    pub fn success_with_data(message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            error: None,
        }
    }

    /// Create a failed result
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Coarse classification of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Success,
    Partial,
    Failure,
}

/// Data produced by one completed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepData {
    pub step_id: String,
    pub action: ActionKind,
    pub data: serde_json::Value,
}

/// Terminal summary of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResult {
    pub success: bool,
    pub outcome: RunOutcome,
    /// Step outputs in step order, kept even when the run failed
    pub data: Vec<StepData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub execution_time_ms: u64,
    #[serde(default)]
    pub cancelled: bool,
    pub completed_steps: usize,
    pub failed_steps: usize,
    /// Final state of every step
    pub steps: Vec<ExecuteStep>,
}
