//! Ollama client implementation
//!
//! Async HTTP client for the Ollama chat API. Plans are short, so requests
//! are non-streaming.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::core::{Config, Result, StepwrightError};
use crate::llm::traits::{ChatMessage, GenerateOptions, LLMProvider, LLMResponse, TokenUsage};

/// Ollama API client
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

/// Ollama chat request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    stream: bool,
}

/// Ollama generation options
#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

/// Ollama chat response (non-streaming)
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
    model: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama models list response
#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

/// Model information
#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

impl OllamaClient {
    /// Create a new Ollama client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.ollama_url(),
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn connect_error(&self, e: reqwest::Error) -> StepwrightError {
        if e.is_connect() {
            StepwrightError::llm(format!(
                "Cannot connect to Ollama at {}. Is it running?",
                self.base_url
            ))
        } else {
            StepwrightError::from(e)
        }
    }

    fn build_options(&self, options: Option<GenerateOptions>) -> OllamaOptions {
        let options = options.unwrap_or_default();
        OllamaOptions {
            temperature: options.temperature.or(Some(self.temperature)),
            num_predict: options.max_tokens,
            stop: options.stop,
        }
    }

    /// Convert Ollama response to LLMResponse
    fn to_llm_response(response: ChatResponse) -> LLMResponse {
        let usage = match (response.prompt_eval_count, response.eval_count) {
            (Some(prompt), Some(completion)) => Some(TokenUsage::new(prompt, completion)),
            _ => None,
        };

        LLMResponse {
            content: response.message.content,
            usage,
            model: response.model,
        }
    }

    /// List installed models
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;

        if !response.status().is_success() {
            return Err(StepwrightError::llm("Failed to list models"));
        }

        let models_response: ModelsResponse = response.json().await?;
        Ok(models_response.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl LLMProvider for OllamaClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            options: Some(self.build_options(options)),
            stream: false,
        };

        debug!(model = %self.model, messages = messages.len(), "Sending Ollama chat request");

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 404 && error_text.contains("not found") {
                return Err(StepwrightError::llm(format!(
                    "Model not found: {}. Run: ollama pull {}",
                    self.model, self.model
                )));
            }

            return Err(StepwrightError::llm(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        let response_text = response.text().await?;
        debug!(bytes = response_text.len(), "Ollama response received");

        let chat_response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| StepwrightError::llm(format!("Failed to parse response: {}", e)))?;

        Ok(Self::to_llm_response(chat_response))
    }

    async fn is_available(&self) -> bool {
        match self.list_models().await {
            Ok(models) => models
                .iter()
                .any(|m| m == &self.model || m.split(':').next() == self.model.split(':').next()),
            Err(e) => {
                debug!(error = %e, "Ollama availability check failed");
                false
            }
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
