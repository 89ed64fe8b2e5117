//! Per-action validation rules
//!
//! Every action kind has an explicit rule here; adding a kind without a rule
//! does not compile.

use std::fmt;

use crate::core::{ActionKind, ExecuteStep};

/// A single reason a step cannot be executed as-is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    MissingDescription,
    MissingUrl,
    MissingTarget,
    /// Value required; the payload names what the value is
    MissingValue(&'static str),
    NonNumericValue,
    MissingKey,
    /// Only raised when strict action types are enabled
    UnknownAction(String),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingDescription => write!(f, "Description is required"),
            ValidationIssue::MissingUrl => write!(f, "URL is required"),
            ValidationIssue::MissingTarget => write!(f, "Target selector required"),
            ValidationIssue::MissingValue(what) => write!(f, "{} required", what),
            ValidationIssue::NonNumericValue => write!(f, "Numeric value required"),
            ValidationIssue::MissingKey => write!(f, "Key value required"),
            ValidationIssue::UnknownAction(raw) => write!(f, "Unknown action type '{}'", raw),
        }
    }
}

/// Parse a non-negative, finite number
pub fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
}

/// Validate one step; an empty list means the step is executable
pub fn validate_step(step: &ExecuteStep) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if step.description.trim().is_empty() {
        issues.push(ValidationIssue::MissingDescription);
    }

    let has_target = step.target().is_some();
    let value = step.value();

    let require_target = |issues: &mut Vec<ValidationIssue>| {
        if !has_target {
            issues.push(ValidationIssue::MissingTarget);
        }
    };

    match step.action {
        ActionKind::Navigate => {
            if !has_target && value.is_none() {
                issues.push(ValidationIssue::MissingUrl);
            }
        }
        ActionKind::Click
        | ActionKind::Focus
        | ActionKind::Blur
        | ActionKind::Hover
        | ActionKind::Clear
        | ActionKind::Submit
        | ActionKind::Toggle
        | ActionKind::SelectRadio
        | ActionKind::Copy
        | ActionKind::Cut
        | ActionKind::Paste
        | ActionKind::ContextMenu
        | ActionKind::WaitForElement
        | ActionKind::VerifyElement => require_target(&mut issues),
        ActionKind::Type => {
            require_target(&mut issues);
            if step.value.is_none() {
                issues.push(ValidationIssue::MissingValue("Text value"));
            }
        }
        ActionKind::Select | ActionKind::SelectOption => {
            require_target(&mut issues);
            if value.is_none() {
                issues.push(ValidationIssue::MissingValue("Option value"));
            }
        }
        ActionKind::SelectFile => {
            require_target(&mut issues);
            if value.is_none() {
                issues.push(ValidationIssue::MissingValue("File path"));
            }
        }
        ActionKind::AdjustSlider => {
            require_target(&mut issues);
            if value.and_then(parse_number).is_none() {
                issues.push(ValidationIssue::NonNumericValue);
            }
        }
        ActionKind::Wait => {
            if value.and_then(parse_number).is_none() {
                issues.push(ValidationIssue::NonNumericValue);
            }
        }
        ActionKind::Keypress => {
            if value.is_none() {
                issues.push(ValidationIssue::MissingKey);
            }
        }
        ActionKind::VerifyText => {
            if value.is_none() {
                issues.push(ValidationIssue::MissingValue("Expected text"));
            }
        }
        ActionKind::VerifyUrl => {
            if !has_target && value.is_none() {
                issues.push(ValidationIssue::MissingValue("Expected URL"));
            }
        }
        ActionKind::WaitForDynamicContent => {
            if let Some(v) = value {
                if parse_number(v).is_none() {
                    issues.push(ValidationIssue::NonNumericValue);
                }
            }
        }
        ActionKind::Scroll | ActionKind::Extract => {}
    }

    issues
}
