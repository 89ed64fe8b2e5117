//! Recording session data model
//!
//! The shape produced by the recording collector. Sessions are read-only
//! inputs to prompt generation and replay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{Result, StepwrightError};
use crate::core::ActionKind;
use crate::plan::normalize::lookup_action_type;

/// Element a recorded action was aimed at
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionTarget {
    /// CSS selector or descriptor
    pub selector: String,
    /// Visible text of the element, for humans
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
}

/// One captured user interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedAction {
    /// Action kind as the recorder named it
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target: ActionTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// What the user was trying to achieve with this action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub timestamp: i64,
}

impl RecordedAction {
    /// Create an action aimed at `selector`
    pub fn new(action_type: impl Into<String>, description: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            description: description.into(),
            target: ActionTarget {
                selector: selector.into(),
                ..Default::default()
            },
            value: None,
            intent: None,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    /// Recorded kind mapped onto the closed action set, if recognised
    pub fn kind(&self) -> Option<ActionKind> {
        lookup_action_type(&self.action_type)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Page state when recording started
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitialContext {
    pub url: String,
    pub title: String,
    pub viewport: Viewport,
}

/// Rough size of the recorded task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    #[default]
    Simple,
    Moderate,
    Complex,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionMetadata {
    pub duration_ms: u64,
    pub success: bool,
    pub complexity: Complexity,
    pub pages_visited: Vec<String>,
}

/// A frozen recording of a user's workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSession {
    pub id: String,
    pub task_goal: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub actions: Vec<RecordedAction>,
    #[serde(default)]
    pub initial_context: InitialContext,
    #[serde(default)]
    pub metadata: SessionMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl RecordingSession {
    /// Start an empty session for `task_goal`
    pub fn new(task_goal: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            task_goal: task_goal.into(),
            description: String::new(),
            actions: Vec::new(),
            initial_context: InitialContext::default(),
            metadata: SessionMetadata::default(),
            recorded_at: Some(Utc::now()),
        }
    }

    /// Set the page the recording started on
    pub fn starting_at(mut self, url: impl Into<String>, title: impl Into<String>) -> Self {
        self.initial_context.url = url.into();
        self.initial_context.title = title.into();
        self
    }

    /// Append an action
    pub fn with_action(mut self, action: RecordedAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Parse a session from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let session: Self = serde_json::from_str(json)?;
        if session.task_goal.trim().is_empty() && session.actions.is_empty() {
            return Err(StepwrightError::Other(
                "Recording session has neither a task goal nor actions".to_string(),
            ));
        }
        Ok(session)
    }

    /// Load a session from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Write the session as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Pages visited, falling back to the initial URL when the metadata is empty
    pub fn pages(&self) -> Vec<&str> {
        if self.metadata.pages_visited.is_empty() {
            let url = self.initial_context.url.as_str();
            return if url.is_empty() { Vec::new() } else { vec![url] };
        }
        self.metadata.pages_visited.iter().map(String::as_str).collect()
    }
}
