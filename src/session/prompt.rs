//! Prompt generation for step planning
//!
//! Pure functions from a recording session (or a bare goal) to the system and
//! user prompt pair sent to the LLM.

use std::fmt::Write;

use crate::core::ActionKind;
use crate::session::model::RecordingSession;

/// Prompt pair for one planning request
#[derive(Debug, Clone, PartialEq)]
pub struct PlanPrompt {
    pub system: String,
    pub user: String,
}

/// Builds planning prompts
#[derive(Debug, Clone)]
pub struct PromptGenerator {
    /// Recorded actions beyond this count are summarized, not listed
    max_actions: usize,
}

impl Default for PromptGenerator {
    fn default() -> Self {
        Self { max_actions: 50 }
    }
}

impl PromptGenerator {
    pub fn new(max_actions: usize) -> Self {
        Self {
            max_actions: max_actions.max(1),
        }
    }

    /// Prompt asking the LLM to turn a recording into a replayable plan
    pub fn generate(&self, session: &RecordingSession) -> PlanPrompt {
        PlanPrompt {
            system: system_prompt(),
            user: self.session_prompt(session),
        }
    }

    /// Prompt for a goal with no recording behind it
    pub fn generate_for_goal(&self, goal: &str, start_url: Option<&str>) -> PlanPrompt {
        let mut user = format!("TASK GOAL: {}\n", goal.trim());
        if let Some(url) = start_url.filter(|u| !u.trim().is_empty()) {
            let _ = writeln!(user, "START URL: {}", url.trim());
        }
        user.push_str("\nProduce the JSON array of steps that accomplishes this goal.");

        PlanPrompt {
            system: system_prompt(),
            user,
        }
    }

    fn session_prompt(&self, session: &RecordingSession) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "TASK GOAL: {}", session.task_goal.trim());
        if !session.description.trim().is_empty() {
            let _ = writeln!(out, "DESCRIPTION: {}", session.description.trim());
        }

        let ctx = &session.initial_context;
        if !ctx.url.is_empty() {
            let _ = writeln!(out, "\nSTARTING PAGE: {}", ctx.url);
            if !ctx.title.is_empty() {
                let _ = writeln!(out, "PAGE TITLE: {}", ctx.title);
            }
            if ctx.viewport.width > 0 {
                let _ = writeln!(out, "VIEWPORT: {}x{}", ctx.viewport.width, ctx.viewport.height);
            }
        }

        let meta = &session.metadata;
        let _ = writeln!(
            out,
            "\nRECORDING: {} actions over {:.1}s, complexity {:?}, {}",
            session.actions.len(),
            meta.duration_ms as f64 / 1000.0,
            meta.complexity,
            if meta.success { "completed successfully" } else { "outcome unknown" }
        );
        let pages = session.pages();
        if pages.len() > 1 {
            let _ = writeln!(out, "PAGES VISITED: {}", pages.join(", "));
        }

        if session.actions.is_empty() {
            out.push_str("\nNo actions were recorded; plan the task from the goal alone.\n");
        } else {
            out.push_str("\nRECORDED ACTIONS:\n");
            for (i, action) in session.actions.iter().take(self.max_actions).enumerate() {
                let _ = write!(out, "{}. [{}] {}", i + 1, action.action_type, action.description.trim());
                if !action.target.selector.is_empty() {
                    let _ = write!(out, " | selector: {}", action.target.selector);
                }
                if let Some(text) = action.target.text.as_deref().filter(|t| !t.is_empty()) {
                    let _ = write!(out, " | element text: \"{}\"", text);
                }
                if let Some(value) = &action.value {
                    let _ = write!(out, " | value: \"{}\"", value);
                }
                if let Some(intent) = &action.intent {
                    let _ = write!(out, " | intent: {}", intent);
                }
                out.push('\n');
            }
            if session.actions.len() > self.max_actions {
                let _ = writeln!(
                    out,
                    "... {} more actions omitted",
                    session.actions.len() - self.max_actions
                );
            }
        }

        out.push_str(
            "\nProduce the JSON array of steps that reproduces this workflow reliably. \
             Prefer stable selectors (ids, names, data attributes) over positional ones.",
        );
        out
    }
}

fn system_prompt() -> String {
    let mut out = String::from(
        "You are a browser automation planner. Convert the user's task into an ordered \
         list of browser actions.\n\nAVAILABLE ACTIONS:\n",
    );

    for kind in ActionKind::ALL {
        let _ = writeln!(out, "- {}: {}", kind.as_str(), kind.usage());
    }

    out.push_str(
        "\nRESPONSE FORMAT:\n\
         Respond with ONLY a JSON array. Each element is an object with:\n\
         - \"action\": one of the action names above\n\
         - \"description\": short human-readable description (required)\n\
         - \"target\": CSS selector or URL, as the action requires\n\
         - \"value\": text, key, option, number or file path, as the action requires\n\
         - \"reasoning\": optional, why this step is needed\n\n\
         Example:\n\
         [\n  {\"action\": \"navigate\", \"target\": \"https://example.com\", \"description\": \"Open the site\"},\n  \
         {\"action\": \"type\", \"target\": \"#search\", \"value\": \"rust\", \"description\": \"Enter the query\"},\n  \
         {\"action\": \"keypress\", \"value\": \"Enter\", \"description\": \"Submit the search\"}\n]\n",
    );
    out
}
