//! Step parser - raw LLM text to a validated execution plan
//!
//! Extraction, normalization, validation and auto-fix are composed here.
//! Parsing is synchronous and holds no state between calls.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::config::{Config, ParserConfig};
use crate::core::{ExecuteStep, Result, StepStatus, StepwrightError};
use crate::plan::autofix::fix_step;
use crate::plan::extract::extract_json;
use crate::plan::normalize::{lookup_action_type, normalize_action_type};
use crate::plan::validate::{validate_step, ValidationIssue};

const ACTION_KEYS: &[&str] = &["action", "type", "actionType", "action_type"];
const TARGET_KEYS: &[&str] = &["target", "selector", "url", "element"];
const VALUE_KEYS: &[&str] = &["value", "text", "input", "key", "option"];
const DESCRIPTION_KEYS: &[&str] = &["description", "desc", "label", "name"];
const REASONING_KEYS: &[&str] = &["reasoning", "reason", "rationale"];

/// Something the parser noticed but did not fail on
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanWarning {
    /// Position in the LLM's array
    pub index: usize,
    pub step_id: String,
    pub message: String,
}

/// Repairs applied to one step
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFix {
    pub step_id: String,
    pub notes: Vec<String>,
}

/// Validated steps plus what happened on the way
#[derive(Debug, Clone, Serialize)]
pub struct ParsedPlan {
    pub steps: Vec<ExecuteStep>,
    pub warnings: Vec<PlanWarning>,
    pub fixes: Vec<AppliedFix>,
}

/// Converts untrusted LLM text into executable steps
#[derive(Debug, Clone)]
pub struct StepParser {
    config: ParserConfig,
    max_retries: u32,
}

impl StepParser {
    /// Create a parser; `max_retries` is stamped on every produced step
    pub fn new(config: ParserConfig, max_retries: u32) -> Self {
        Self {
            config,
            max_retries,
        }
    }

    /// Create a parser from the full configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.parser.clone(), config.execution.max_retries)
    }

    /// Parse, validate and repair the steps contained in `raw`
    pub fn parse_and_validate_steps(&self, raw: &str) -> Result<ParsedPlan> {
        let json = extract_json(raw)?;
        let items: Vec<Value> = serde_json::from_str(&json)?;

        let mut plan = ParsedPlan {
            steps: Vec::with_capacity(items.len()),
            warnings: Vec::new(),
            fixes: Vec::new(),
        };

        for (index, item) in items.iter().enumerate() {
            let (step, raw_action) = self.candidate(index, item);
            let mut issues = validate_step(&step);

            if let Some(raw_action) = raw_action {
                if self.config.strict_action_types {
                    issues.push(ValidationIssue::UnknownAction(raw_action));
                } else {
                    plan.warnings.push(PlanWarning {
                        index,
                        step_id: step.id.clone(),
                        message: format!("unknown action '{}' treated as click", raw_action),
                    });
                }
            }

            if issues.is_empty() {
                plan.steps.push(step);
                continue;
            }

            debug!(step_id = %step.id, ?issues, "Step failed validation");

            let fixable = !issues
                .iter()
                .any(|i| matches!(i, ValidationIssue::UnknownAction(_)));

            if self.config.auto_fix && fixable {
                let (fixed, notes) = fix_step(&step, &issues);
                let remaining = validate_step(&fixed);
                if remaining.is_empty() {
                    plan.fixes.push(AppliedFix {
                        step_id: fixed.id.clone(),
                        notes,
                    });
                    plan.steps.push(fixed);
                    continue;
                }
                issues = remaining;
            }

            let reasons = issues
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            warn!(step_id = %step.id, action = %step.action, %reasons, "Dropping invalid step");
            plan.warnings.push(PlanWarning {
                index,
                step_id: step.id.clone(),
                message: format!("dropped {} step: {}", step.action, reasons),
            });
        }

        if plan.steps.is_empty() {
            return Err(StepwrightError::NoValidSteps(format!(
                "none of the {} candidate steps passed validation",
                items.len()
            )));
        }

        debug!(
            steps = plan.steps.len(),
            warnings = plan.warnings.len(),
            fixes = plan.fixes.len(),
            "Parsed execution plan"
        );

        Ok(plan)
    }

    /// Map one array element to a candidate step.
    ///
    /// Also returns the raw action text when it was not recognised.
    fn candidate(&self, index: usize, item: &Value) -> (ExecuteStep, Option<String>) {
        let raw_action = first_string(item, ACTION_KEYS).unwrap_or_default();
        let recognised = lookup_action_type(&raw_action);
        let action = recognised.unwrap_or_else(|| normalize_action_type(&raw_action));

        let step = ExecuteStep {
            id: format!("step-{}", index + 1),
            action,
            description: first_string(item, DESCRIPTION_KEYS).unwrap_or_default(),
            target: first_target(item).unwrap_or_default(),
            value: first_string(item, VALUE_KEYS),
            reasoning: first_string(item, REASONING_KEYS),
            status: StepStatus::Pending,
            max_retries: self.max_retries,
            retry_count: 0,
        };

        (step, recognised.is_none().then_some(raw_action))
    }
}

/// Scalar field as text; objects and arrays are not accepted
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn first_string(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| item.get(*key))
        .find_map(scalar_text)
}

/// Target may also arrive as `{ "selector": ... }` the way recordings store it
fn first_target(item: &Value) -> Option<String> {
    TARGET_KEYS
        .iter()
        .filter_map(|key| item.get(*key))
        .find_map(|value| match value {
            Value::Object(_) => value
                .get("selector")
                .or_else(|| value.get("url"))
                .and_then(scalar_text),
            other => scalar_text(other),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ActionKind;

    fn parser() -> StepParser {
        StepParser::new(ParserConfig::default(), 3)
    }

    fn strict_parser() -> StepParser {
        StepParser::new(
            ParserConfig {
                auto_fix: true,
                strict_action_types: true,
            },
            3,
        )
    }

    #[test]
    fn test_one_step_per_valid_element() {
        let raw = r##"[
            {"action": "navigate", "target": "https://x.test", "description": "Open site"},
            {"action": "type", "target": "#q", "value": "hi", "description": "Type query"},
            {"action": "keypress", "value": "Enter", "description": "Submit search", "reasoning": "faster"}
        ]"##;
        let plan = parser().parse_and_validate_steps(raw).unwrap();

        assert_eq!(plan.steps.len(), 3);
        assert!(plan.warnings.is_empty());
        assert!(plan.fixes.is_empty());
        assert_eq!(plan.steps[0].id, "step-1");
        assert_eq!(plan.steps[1].action, ActionKind::Type);
        assert_eq!(plan.steps[1].value.as_deref(), Some("hi"));
        assert_eq!(plan.steps[2].reasoning.as_deref(), Some("faster"));
        for step in &plan.steps {
            assert_eq!(step.status, StepStatus::Pending);
            assert_eq!(step.retry_count, 0);
            assert_eq!(step.max_retries, 3);
        }
    }

    #[test]
    fn test_field_aliases_and_scalars() {
        let raw = r##"[
            {"type": "visit", "url": "https://x.test", "desc": "Go"},
            {"actionType": "wait", "value": 1500, "description": "Pause"},
            {"action": "toggle", "selector": "#agree", "value": true, "description": "Accept"},
            {"action": "click", "target": {"selector": "#buy", "text": "Buy"}, "description": "Buy it"}
        ]"##;
        let plan = parser().parse_and_validate_steps(raw).unwrap();

        assert_eq!(plan.steps.len(), 4);
        assert_eq!(plan.steps[0].action, ActionKind::Navigate);
        assert_eq!(plan.steps[0].target, "https://x.test");
        assert_eq!(plan.steps[1].value.as_deref(), Some("1500"));
        assert_eq!(plan.steps[2].value.as_deref(), Some("true"));
        assert_eq!(plan.steps[3].target, "#buy");
    }

    #[test]
    fn test_missing_descriptions_are_synthesized() {
        let raw = r##"[{"action":"navigate","target":"https://x.test"},{"action":"type","target":"#q","value":"hi"}]"##;
        let plan = parser().parse_and_validate_steps(raw).unwrap();

        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.fixes.len(), 2);
        assert_eq!(plan.steps[0].description, "Navigate to https://x.test");
        assert_eq!(plan.steps[1].description, "Type into #q");
    }

    #[test]
    fn test_unfixable_step_is_dropped_with_warning() {
        let raw = r##"[
            {"action": "click", "target": "#start", "description": "Start"},
            {"action": "wait", "value": "not-a-number", "description": "Wait for the page to settle"}
        ]"##;
        let plan = parser().parse_and_validate_steps(raw).unwrap();

        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.warnings.len(), 1);
        assert_eq!(plan.warnings[0].step_id, "step-2");
        assert!(plan.warnings[0].message.contains("Numeric value required"));
    }

    #[test]
    fn test_unknown_action_falls_back_to_click_with_warning() {
        let raw = r##"[{"action": "teleport", "target": "#door", "description": "Go through"}]"##;
        let plan = parser().parse_and_validate_steps(raw).unwrap();

        assert_eq!(plan.steps[0].action, ActionKind::Click);
        assert_eq!(plan.warnings.len(), 1);
        assert!(plan.warnings[0].message.contains("teleport"));
    }

    #[test]
    fn test_strict_mode_rejects_unknown_action() {
        let raw = r##"[
            {"action": "teleport", "target": "#door", "description": "Go through"},
            {"action": "click", "target": "#ok", "description": "Confirm"}
        ]"##;
        let plan = strict_parser().parse_and_validate_steps(raw).unwrap();

        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].id, "step-2");
        assert!(plan.warnings[0].message.contains("Unknown action type 'teleport'"));
    }

    #[test]
    fn test_all_invalid_is_no_valid_steps() {
        let raw = r#"[{"action": "wait", "value": "soon", "description": "Wait a bit"}, 42]"#;
        let err = parser().parse_and_validate_steps(raw).unwrap_err();
        assert!(matches!(err, StepwrightError::NoValidSteps(_)));
    }

    #[test]
    fn test_no_array_is_parse_error() {
        let err = parser()
            .parse_and_validate_steps("Sorry, I can't produce a plan.")
            .unwrap_err();
        assert!(matches!(err, StepwrightError::Parse(_)));
    }

    #[test]
    fn test_auto_fix_can_be_disabled() {
        let parser = StepParser::new(
            ParserConfig {
                auto_fix: false,
                strict_action_types: false,
            },
            1,
        );
        let raw = r##"[{"action":"click","target":"#a","description":"A"},{"action":"navigate","target":"https://x.test"}]"##;
        let plan = parser.parse_and_validate_steps(raw).unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert!(plan.fixes.is_empty());
    }
}
