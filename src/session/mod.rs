//! Session module - recorded workflows and the prompts built from them
//!
//! A `RecordingSession` is the read-only input contract: the prompt generator
//! turns it into an LLM request and the replication path copies it into steps.

pub mod model;
pub mod prompt;
pub mod replicate;

pub use model::{ActionTarget, Complexity, InitialContext, RecordedAction, RecordingSession, SessionMetadata, Viewport};
pub use prompt::{PlanPrompt, PromptGenerator};
pub use replicate::steps_from_session;
