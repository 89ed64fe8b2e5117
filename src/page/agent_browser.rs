//! Page handle backed by the agent-browser CLI
//!
//! Every capability maps to one `agent-browser` invocation, falling back to
//! `eval` for operations the CLI has no command for. CLI failures are
//! classified into `PageError` kinds from their stderr text.

use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::core::config::BrowserConfig;
use crate::page::snapshot::{AccessibilitySnapshot, PageSnapshot};
use crate::page::{js_string, PageError, PageHandle, PageResult, ScrollTarget};

const MISSING: &str = "__stepwright_missing__";

/// Browser session driven through agent-browser
pub struct AgentBrowserPage {
    binary: String,
    /// Session name for isolation
    session_name: String,
    /// Whether to run in headed mode
    headed: bool,
    /// Upper bound for a single CLI call
    command_timeout: Duration,
    /// Text held by copy/cut for a later paste
    clipboard: Mutex<String>,
}

impl AgentBrowserPage {
    pub fn new(session_name: impl Into<String>) -> Self {
        Self::from_config(&BrowserConfig {
            session_name: session_name.into(),
            ..Default::default()
        })
    }

    pub fn from_config(config: &BrowserConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            session_name: config.session_name.clone(),
            headed: config.headed,
            command_timeout: Duration::from_millis(config.timeout_ms.max(1)),
            clipboard: Mutex::new(String::new()),
        }
    }

    /// Set headed mode
    pub fn set_headed(&mut self, headed: bool) {
        self.headed = headed;
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Check if agent-browser is installed
    pub async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Close the browser session
    pub async fn close(&self) -> PageResult<()> {
        self.run_command(&["close"], "close").await.map(|_| ())
    }

    /// Run an agent-browser command
    async fn run_command(&self, args: &[&str], subject: &str) -> PageResult<String> {
        self.run_command_with_timeout(args, subject, self.command_timeout)
            .await
    }

    async fn run_command_with_timeout(
        &self,
        args: &[&str],
        subject: &str,
        limit: Duration,
    ) -> PageResult<String> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["--session", &self.session_name]);

        if self.headed {
            cmd.arg("--headed");
        }

        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        trace!(session = %self.session_name, ?args, "agent-browser");

        let output = match tokio::time::timeout(limit, cmd.output()).await {
            Ok(result) => result.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PageError::Disconnected(format!(
                        "{} is not installed. Install with: npm install -g agent-browser",
                        self.binary
                    ))
                } else {
                    PageError::Other(format!("Failed to run {}: {}", self.binary, e))
                }
            })?,
            Err(_) => {
                return Err(PageError::Timeout {
                    what: subject.to_string(),
                    ms: limit.as_millis() as u64,
                })
            }
        };

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let message = if stderr.trim().is_empty() { stdout } else { stderr };
            debug!(command = args.first().copied().unwrap_or_default(), error = %message.trim(), "agent-browser command failed");
            Err(classify_failure(message.trim(), subject, limit))
        }
    }

    /// Evaluate a script and decode its printed result
    async fn eval(&self, script: &str) -> PageResult<Value> {
        let output = self.run_command(&["eval", script], "script").await?;
        Ok(parse_eval_output(&output))
    }

    /// Evaluate `body` with `el` bound to the element matched by `selector`
    async fn eval_on(&self, selector: &str, body: &str) -> PageResult<Value> {
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); if (!el) return '{missing}'; {body} }})()",
            sel = js_string(selector),
            missing = MISSING,
        );
        let value = self.eval(&script).await?;
        if value.as_str() == Some(MISSING) {
            return Err(PageError::ElementNotFound(selector.to_string()));
        }
        Ok(value)
    }

    async fn eval_flag(&self, script: &str) -> PageResult<bool> {
        let value = self.eval(script).await?;
        Ok(value.as_bool().unwrap_or_else(|| value.as_str() == Some("true")))
    }
}

impl Default for AgentBrowserPage {
    fn default() -> Self {
        Self::from_config(&BrowserConfig::default())
    }
}

/// Map CLI error text to a page error kind
fn classify_failure(message: &str, subject: &str, limit: Duration) -> PageError {
    let lower = message.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["target closed", "browser has been closed", "session closed", "not connected", "econnrefused", "no browser"]) {
        PageError::Disconnected(message.to_string())
    } else if has(&["page has been destroyed", "page crashed", "execution context was destroyed"]) {
        PageError::Destroyed
    } else if has(&["timeout", "timed out"]) {
        PageError::Timeout {
            what: subject.to_string(),
            ms: limit.as_millis() as u64,
        }
    } else if has(&["not found", "no element", "no node", "failed to find", "unknown ref"]) {
        PageError::ElementNotFound(subject.to_string())
    } else if has(&["not visible", "not interactable", "disabled", "intercepts pointer", "not editable", "detached"]) {
        PageError::NotInteractable(format!("{}: {}", subject, message))
    } else if has(&["net::err", "navigation", "invalid url", "cannot navigate"]) {
        PageError::Navigation(message.to_string())
    } else if has(&["evaluation failed", "referenceerror", "typeerror", "syntaxerror"]) {
        PageError::Script(message.to_string())
    } else {
        PageError::Other(message.to_string())
    }
}

/// eval prints JSON for structured values and bare text otherwise
fn parse_eval_output(output: &str) -> Value {
    let trimmed = output.trim();
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}

fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl PageHandle for AgentBrowserPage {
    async fn navigate(&self, url: &str) -> PageResult<()> {
        self.run_command(&["open", url], url)
            .await
            .map_err(|e| match e {
                PageError::Other(msg) => PageError::Navigation(msg),
                other => other,
            })?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> PageResult<()> {
        self.run_command(&["click", selector], selector).await?;
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> PageResult<()> {
        self.run_command(&["fill", selector, text], selector).await?;
        Ok(())
    }

    async fn focus(&self, selector: &str) -> PageResult<()> {
        self.run_command(&["focus", selector], selector).await?;
        Ok(())
    }

    async fn blur(&self, selector: &str) -> PageResult<()> {
        self.eval_on(selector, "el.blur(); return 'ok';").await?;
        Ok(())
    }

    async fn hover(&self, selector: &str) -> PageResult<()> {
        self.run_command(&["hover", selector], selector).await?;
        Ok(())
    }

    async fn keypress(&self, selector: Option<&str>, key: &str) -> PageResult<()> {
        if let Some(selector) = selector {
            self.focus(selector).await?;
        }
        self.run_command(&["press", key], key).await?;
        Ok(())
    }

    async fn select_option(&self, selector: &str, value: &str) -> PageResult<()> {
        self.run_command(&["select", selector, value], selector).await?;
        Ok(())
    }

    async fn toggle_checkbox(&self, selector: &str, checked: Option<bool>) -> PageResult<()> {
        let command = match checked {
            Some(true) => "check",
            Some(false) => "uncheck",
            None => "click",
        };
        self.run_command(&[command, selector], selector).await?;
        Ok(())
    }

    async fn select_radio(&self, selector: &str) -> PageResult<()> {
        self.run_command(&["check", selector], selector).await?;
        Ok(())
    }

    async fn select_file(&self, selector: &str, path: &str) -> PageResult<()> {
        self.run_command(&["upload", selector, path], selector).await?;
        Ok(())
    }

    async fn adjust_slider(&self, selector: &str, value: f64) -> PageResult<()> {
        let body = format!(
            "el.value = {value}; el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); return String(el.value);"
        );
        self.eval_on(selector, &body).await?;
        Ok(())
    }

    async fn copy(&self, selector: &str) -> PageResult<String> {
        let text = value_text(
            self.eval_on(selector, "return ('value' in el ? el.value : el.innerText) || '';")
                .await?,
        );
        *self.clipboard.lock().await = text.clone();
        Ok(text)
    }

    async fn cut(&self, selector: &str) -> PageResult<String> {
        let body = "if (!('value' in el)) return null; const v = el.value; el.value = ''; \
                    el.dispatchEvent(new Event('input', { bubbles: true })); return v;";
        let value = self.eval_on(selector, body).await?;
        if value.is_null() {
            return Err(PageError::NotInteractable(format!(
                "{} is not an editable field",
                selector
            )));
        }
        let text = value_text(value);
        *self.clipboard.lock().await = text.clone();
        Ok(text)
    }

    async fn paste(&self, selector: &str) -> PageResult<String> {
        let text = self.clipboard.lock().await.clone();
        self.run_command(&["type", selector, &text], selector).await?;
        Ok(text)
    }

    async fn scroll(&self, target: &ScrollTarget, amount: Option<u32>) -> PageResult<()> {
        match target {
            ScrollTarget::Up | ScrollTarget::Down => {
                let direction = target.to_string();
                let pixels = amount.map(|px| px.to_string());
                let mut args = vec!["scroll", direction.as_str()];
                if let Some(px) = &pixels {
                    args.push(px);
                }
                self.run_command(&args, &direction).await?;
            }
            ScrollTarget::Top => {
                self.eval("window.scrollTo(0, 0)").await?;
            }
            ScrollTarget::Bottom => {
                self.eval("window.scrollTo(0, document.body.scrollHeight)").await?;
            }
            ScrollTarget::Element(selector) => {
                self.eval_on(selector, "el.scrollIntoView({ block: 'center' }); return 'ok';")
                    .await?;
            }
        }
        Ok(())
    }

    async fn context_menu(&self, selector: &str) -> PageResult<()> {
        let body = "const r = el.getBoundingClientRect(); \
                    el.dispatchEvent(new MouseEvent('contextmenu', { bubbles: true, cancelable: true, \
                    button: 2, clientX: r.left + r.width / 2, clientY: r.top + r.height / 2 })); return 'ok';";
        self.eval_on(selector, body).await?;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> PageResult<()> {
        self.run_command_with_timeout(&["wait", selector], selector, timeout)
            .await?;
        Ok(())
    }

    async fn wait_for_dynamic_content(&self, timeout: Duration) -> PageResult<()> {
        self.run_command_with_timeout(&["wait", "--load", "networkidle"], "network idle", timeout)
            .await?;
        Ok(())
    }

    async fn verify_element(&self, selector: &str) -> PageResult<bool> {
        self.eval_flag(&format!("!!document.querySelector({})", js_string(selector)))
            .await
    }

    async fn verify_text(&self, selector: Option<&str>, text: &str) -> PageResult<bool> {
        let scope = match selector {
            Some(selector) => format!("document.querySelector({})", js_string(selector)),
            None => "document.body".to_string(),
        };
        self.eval_flag(&format!(
            "(() => {{ const el = {scope}; return !!el && (el.innerText || '').includes({text}); }})()",
            text = js_string(text)
        ))
        .await
    }

    async fn current_url(&self) -> PageResult<String> {
        self.run_command(&["get", "url"], "url")
            .await
            .map(|s| s.trim().to_string())
    }

    async fn extract(&self, selector: Option<&str>) -> PageResult<PageSnapshot> {
        let url = self.current_url().await?;
        let title = self
            .run_command(&["get", "title"], "title")
            .await
            .map(|s| s.trim().to_string())?;

        if let Some(selector) = selector {
            let text = self.run_command(&["get", "text", selector], selector).await?;
            return Ok(PageSnapshot {
                url,
                title,
                text: Some(text.trim().to_string()),
                elements: Vec::new(),
            });
        }

        let output = self
            .run_command(&["snapshot", "-i", "--json"], "snapshot")
            .await?;
        let snapshot = AccessibilitySnapshot::parse(&output);

        Ok(PageSnapshot {
            url,
            title,
            text: snapshot
                .as_ref()
                .and_then(|s| s.raw_tree())
                .map(str::to_string),
            elements: snapshot
                .map(|s| s.interactive_elements())
                .unwrap_or_default(),
        })
    }

    async fn execute_script(&self, script: &str) -> PageResult<Value> {
        self.eval(script).await
    }
}
