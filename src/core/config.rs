//! Configuration management for Stepwright
//!
//! Supports environment variables, config files, and runtime overrides.
//! The config value is built once by the caller and passed down explicitly.
//!
//! Config file location: ~/.config/stepwright/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::error::{Result, StepwrightError};

/// Main configuration for Stepwright
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM provider configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Step runner configuration
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Plan parser configuration
    #[serde(default)]
    pub parser: ParserConfig,
    /// Browser configuration
    #[serde(default)]
    pub browser: BrowserConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which LLM backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Ollama,
    OpenAi,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend to use
    pub provider: ProviderType,
    /// Ollama host address (default: localhost)
    pub host: String,
    /// Ollama port number (default: 11434)
    pub port: u16,
    /// Base URL of an OpenAI-compatible API
    pub base_url: String,
    /// Model used to turn recordings into step plans
    pub model: String,
    /// API key, only needed by hosted providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Sampling temperature for plan generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Step runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Retries per step after the first attempt
    pub max_retries: u32,
    /// Bounded wait for a single strategy invocation
    pub step_timeout_ms: u64,
    /// Pause after every attempt, successful or not
    pub inter_step_delay_ms: u64,
    /// Backoff base; delay = base * multiplier^retry_count
    pub backoff_base_ms: u64,
    pub backoff_multiplier: f64,
    /// Upper bound for a single backoff delay
    pub backoff_max_ms: u64,
    /// Failures among the first N steps abort the run
    pub bootstrap_steps: usize,
    /// A failure of the plan's first navigate step aborts the run
    pub abort_on_first_navigate: bool,
    /// Default wait for wait_for_element steps without a timeout value
    pub element_timeout_ms: u64,
    /// Default wait for wait_for_dynamic_content steps
    pub dynamic_content_timeout_ms: u64,
}

/// Plan parser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Try heuristic repairs on invalid steps before dropping them
    pub auto_fix: bool,
    /// Reject unknown action names instead of falling back to click
    pub strict_action_types: bool,
}

/// Browser automation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// agent-browser executable
    pub binary: String,
    /// Session name for agent-browser
    pub session_name: String,
    /// Whether to run in headed mode (visible browser)
    pub headed: bool,
    /// Default timeout for browser operations in ms
    pub timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when RUST_LOG is unset
    pub level: String,
    /// Emit JSON log lines
    pub json: bool,
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name).ok().map(|v| v == "true" || v == "1")
}

impl Default for LlmConfig {
    fn default() -> Self {
        let provider = match env::var("STEPWRIGHT_PROVIDER").as_deref() {
            Ok("openai") => ProviderType::OpenAi,
            _ => ProviderType::Ollama,
        };

        Self {
            provider,
            host: env::var("OLLAMA_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("OLLAMA_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(11434),
            base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            model: env::var("STEPWRIGHT_MODEL").unwrap_or_else(|_| "qwen3:8b".to_string()),
            api_key: env::var("OPENAI_API_KEY").ok(),
            temperature: 0.1,
            timeout_secs: 120,
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_retries: env::var("STEPWRIGHT_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            step_timeout_ms: 30_000,
            inter_step_delay_ms: 1_000,
            backoff_base_ms: 500,
            backoff_multiplier: 2.0,
            backoff_max_ms: 10_000,
            bootstrap_steps: 1,
            abort_on_first_navigate: true,
            element_timeout_ms: 10_000,
            dynamic_content_timeout_ms: 5_000,
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            auto_fix: true,
            strict_action_types: env_flag("STEPWRIGHT_STRICT_ACTIONS").unwrap_or(false),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            binary: env::var("STEPWRIGHT_BROWSER_BIN")
                .unwrap_or_else(|_| "agent-browser".to_string()),
            session_name: env::var("STEPWRIGHT_BROWSER_SESSION")
                .unwrap_or_else(|_| "stepwright".to_string()),
            headed: env_flag("STEPWRIGHT_BROWSER_HEADED").unwrap_or(false),
            timeout_ms: 30_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: env::var("STEPWRIGHT_LOG").unwrap_or_else(|_| "info".to_string()),
            json: env_flag("STEPWRIGHT_LOG_JSON").unwrap_or(false),
        }
    }
}

impl ExecutionConfig {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }

    pub fn inter_step_delay(&self) -> Duration {
        Duration::from_millis(self.inter_step_delay_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn dynamic_content_timeout(&self) -> Duration {
        Duration::from_millis(self.dynamic_content_timeout_ms)
    }

    /// Delay before retry number `retry_count` (1-based), capped at `backoff_max_ms`
    pub fn backoff_delay(&self, retry_count: u32) -> Duration {
        let factor = self
            .backoff_multiplier
            .max(1.0)
            .powi(retry_count.min(i32::MAX as u32) as i32);
        let ms = (self.backoff_base_ms as f64 * factor).min(self.backoff_max_ms as f64);
        Duration::from_millis(ms as u64)
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stepwright")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > config file > env vars > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        match Self::load_from_file() {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Using default configuration: {}", e);
                Self::default()
            }
        }
    }

    /// Load configuration from the default file only
    pub fn load_from_file() -> Result<Self> {
        Self::load_from_path(&Self::config_file())
    }

    /// Load configuration from an explicit path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(StepwrightError::config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| StepwrightError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text; missing sections fall back to defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| StepwrightError::config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to the default file and return the path
    pub fn save(&self) -> Result<PathBuf> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir).map_err(|e| {
                StepwrightError::config(format!("Failed to create config dir: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| StepwrightError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)
            .map_err(|e| StepwrightError::config(format!("Failed to write config: {}", e)))?;

        Ok(config_path)
    }

    /// Check if a config file exists
    pub fn config_exists() -> bool {
        Self::config_file().exists()
    }

    /// Get the full Ollama API URL
    pub fn ollama_url(&self) -> String {
        format!("http://{}:{}", self.llm.host, self.llm.port)
    }

    /// Generate a default config file content for display
    pub fn default_config_toml() -> String {
        toml::to_string_pretty(&Config::default())
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_execution_policy() {
        let config = ExecutionConfig {
            max_retries: 3,
            ..ExecutionConfig::default()
        };
        assert_eq!(config.step_timeout(), Duration::from_secs(30));
        assert_eq!(config.inter_step_delay(), Duration::from_secs(1));
        assert_eq!(config.backoff_base_ms, 500);
        assert_eq!(config.bootstrap_steps, 1);
        assert!(config.abort_on_first_navigate);
    }

    #[test]
    fn test_backoff_grows_then_caps() {
        let config = ExecutionConfig {
            backoff_base_ms: 500,
            backoff_multiplier: 2.0,
            backoff_max_ms: 3_000,
            ..ExecutionConfig::default()
        };
        assert_eq!(config.backoff_delay(1), Duration::from_millis(1_000));
        assert_eq!(config.backoff_delay(2), Duration::from_millis(2_000));
        assert_eq!(config.backoff_delay(3), Duration::from_millis(3_000));
        assert_eq!(config.backoff_delay(30), Duration::from_millis(3_000));
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config = Config::from_toml(
            r#"
            [execution]
            max_retries = 5
            inter_step_delay_ms = 0

            [parser]
            strict_action_types = true
            "#,
        )
        .unwrap();

        assert_eq!(config.execution.max_retries, 5);
        assert_eq!(config.execution.inter_step_delay_ms, 0);
        assert_eq!(config.execution.step_timeout_ms, 30_000);
        assert!(config.parser.strict_action_types);
        assert!(config.parser.auto_fix);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml("execution = 3").unwrap_err();
        assert!(matches!(err, StepwrightError::Config(_)));
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = Config::default_config_toml();
        assert!(toml_str.contains("[execution]"));
        assert!(toml_str.contains("max_retries"));
        assert!(toml_str.contains("backoff_multiplier"));
    }

    #[test]
    fn test_config_dir() {
        let dir = Config::config_dir();
        assert!(dir.to_string_lossy().contains("stepwright"));
    }
}
