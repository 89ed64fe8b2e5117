//! Page module - the browser surface the engine drives
//!
//! `PageHandle` is the capability set strategies call into. Hard failures
//! (the handle is gone) are distinguished from soft ones (a selector is not
//! there yet) through `PageError::is_fatal`.

pub mod agent_browser;
pub mod snapshot;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub use agent_browser::AgentBrowserPage;
pub use snapshot::{PageSnapshot, SnapshotElement};

/// Failure reported by a page handle
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PageError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Element not interactable: {0}")]
    NotInteractable(String),

    #[error("Timed out after {ms}ms: {what}")]
    Timeout { what: String, ms: u64 },

    #[error("Script error: {0}")]
    Script(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// A verify step observed something other than expected
    #[error("Verification failed: {0}")]
    Verification(String),

    #[error("Page handle disconnected: {0}")]
    Disconnected(String),

    #[error("Page handle destroyed")]
    Destroyed,

    #[error("{0}")]
    Other(String),
}

impl PageError {
    /// The handle is unusable and no further step can run against it
    pub fn is_fatal(&self) -> bool {
        matches!(self, PageError::Disconnected(_) | PageError::Destroyed)
    }
}

pub type PageResult<T> = std::result::Result<T, PageError>;

/// Where a scroll step should go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollTarget {
    Up,
    Down,
    Top,
    Bottom,
    Element(String),
}

impl ScrollTarget {
    /// Directions by name, anything else is a selector; empty means down
    pub fn parse(target: &str) -> Self {
        match target.trim().to_lowercase().as_str() {
            "" | "down" => ScrollTarget::Down,
            "up" => ScrollTarget::Up,
            "top" => ScrollTarget::Top,
            "bottom" | "end" => ScrollTarget::Bottom,
            _ => ScrollTarget::Element(target.trim().to_string()),
        }
    }
}

impl fmt::Display for ScrollTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrollTarget::Up => write!(f, "up"),
            ScrollTarget::Down => write!(f, "down"),
            ScrollTarget::Top => write!(f, "top"),
            ScrollTarget::Bottom => write!(f, "bottom"),
            ScrollTarget::Element(selector) => write!(f, "{}", selector),
        }
    }
}

/// Capability set of a live browser document
///
/// Every operation may suspend. Implementations return `PageError` values
/// instead of panicking; only `Disconnected` and `Destroyed` are fatal.
#[async_trait]
pub trait PageHandle: Send + Sync {
    async fn navigate(&self, url: &str) -> PageResult<()>;

    async fn click(&self, selector: &str) -> PageResult<()>;

    /// Replace the content of an input with `text`
    async fn type_text(&self, selector: &str, text: &str) -> PageResult<()>;

    async fn focus(&self, selector: &str) -> PageResult<()>;

    async fn blur(&self, selector: &str) -> PageResult<()>;

    async fn hover(&self, selector: &str) -> PageResult<()>;

    /// Press a key, on an element when `selector` is given
    async fn keypress(&self, selector: Option<&str>, key: &str) -> PageResult<()>;

    async fn select_option(&self, selector: &str, value: &str) -> PageResult<()>;

    /// Set a checkbox; `None` flips it
    async fn toggle_checkbox(&self, selector: &str, checked: Option<bool>) -> PageResult<()>;

    async fn select_radio(&self, selector: &str) -> PageResult<()>;

    async fn select_file(&self, selector: &str, path: &str) -> PageResult<()>;

    async fn adjust_slider(&self, selector: &str, value: f64) -> PageResult<()>;

    /// Copy the element's text or value, returning it
    async fn copy(&self, selector: &str) -> PageResult<String>;

    /// Copy then empty an input, returning the removed text
    async fn cut(&self, selector: &str) -> PageResult<String>;

    /// Insert the clipboard into an input, returning what was pasted
    async fn paste(&self, selector: &str) -> PageResult<String>;

    async fn scroll(&self, target: &ScrollTarget, amount: Option<u32>) -> PageResult<()>;

    async fn context_menu(&self, selector: &str) -> PageResult<()>;

    async fn wait_millis(&self, ms: u64) -> PageResult<()> {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> PageResult<()>;

    /// Wait until the page stops loading or mutating
    async fn wait_for_dynamic_content(&self, timeout: Duration) -> PageResult<()>;

    /// Whether the element exists
    async fn verify_element(&self, selector: &str) -> PageResult<bool>;

    /// Whether `text` is visible, inside `selector` when given
    async fn verify_text(&self, selector: Option<&str>, text: &str) -> PageResult<bool>;

    async fn current_url(&self) -> PageResult<String>;

    /// Whether the current URL contains `expected`
    async fn verify_url(&self, expected: &str) -> PageResult<bool> {
        let url = self.current_url().await?;
        Ok(url.contains(expected.trim()))
    }

    /// Structured snapshot of the page, or of one element
    async fn extract(&self, selector: Option<&str>) -> PageResult<PageSnapshot>;

    async fn execute_script(&self, script: &str) -> PageResult<serde_json::Value>;

    /// Clear an input
    async fn clear(&self, selector: &str) -> PageResult<()> {
        self.type_text(selector, "").await
    }

    /// Submit the form owning `selector`
    async fn submit(&self, selector: &str) -> PageResult<()> {
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); if (!el) return 'missing'; \
             const form = el.tagName === 'FORM' ? el : el.form || el.closest('form'); \
             if (!form) return 'noform'; \
             if (form.requestSubmit) form.requestSubmit(); else form.submit(); return 'ok'; }})()",
            sel = js_string(selector)
        );
        match self.execute_script(&script).await?.as_str() {
            Some("ok") => Ok(()),
            Some("noform") => Err(PageError::NotInteractable(format!(
                "{} is not inside a form",
                selector
            ))),
            _ => Err(PageError::ElementNotFound(selector.to_string())),
        }
    }
}

/// Quote a value as a JavaScript string literal
pub fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
