//! Custom error types for Stepwright
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

use crate::core::types::ActionKind;

/// Main error type for Stepwright operations
#[derive(Error, Debug)]
pub enum StepwrightError {
    /// The LLM response contained no extractable JSON array
    #[error("Parse error: {0}")]
    Parse(String),

    /// Every candidate step was invalid, nothing left to execute
    #[error("No valid steps: {0}")]
    NoValidSteps(String),

    /// No strategy registered for an action kind
    #[error("No strategy for action type '{0}'")]
    NoStrategy(ActionKind),

    /// A run is already active against this page handle
    #[error("Workflow is already executing")]
    AlreadyExecuting,

    /// The page handle became unusable; the run cannot continue
    #[error("Fatal run error: {0}")]
    Fatal(String),

    /// The run was cancelled by the user
    #[error("Workflow cancelled by user")]
    Cancelled,

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Browser automation errors
    #[error("Browser error: {0}")]
    Browser(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for Stepwright operations
pub type Result<T> = std::result::Result<T, StepwrightError>;

impl StepwrightError {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an LLM error
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Create a browser error
    pub fn browser(msg: impl Into<String>) -> Self {
        Self::Browser(msg.into())
    }

    /// Create a fatal run error
    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the error should stop the remaining plan immediately
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_) | Self::NoStrategy(_))
    }
}
