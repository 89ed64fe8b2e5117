//! Plan module - turns untrusted LLM output into executable steps
//!
//! Extraction, action-name normalization, per-action validation and the
//! heuristic auto-fix layer, composed by `StepParser`.

pub mod autofix;
pub mod extract;
pub mod normalize;
pub mod parser;
pub mod validate;

pub use autofix::attempt_step_fix;
pub use extract::extract_json;
pub use normalize::{lookup_action_type, normalize_action_type};
pub use parser::{AppliedFix, ParsedPlan, PlanWarning, StepParser};
pub use validate::{validate_step, ValidationIssue};
