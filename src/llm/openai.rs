//! OpenAI-compatible provider
//!
//! Talks to any `/chat/completions` endpoint (OpenAI, OpenRouter, vLLM,
//! LM Studio) with an optional bearer key.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::core::{Config, Result, StepwrightError};
use crate::llm::traits::{ChatMessage, GenerateOptions, LLMProvider, LLMResponse, TokenUsage};

/// Client for OpenAI-style chat completion APIs
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl OpenAiClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.llm.base_url.trim_end_matches('/').to_string(),
            api_key: config.llm.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    fn to_llm_response(&self, response: CompletionResponse) -> Result<LLMResponse> {
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| StepwrightError::llm("Response contained no choices"))?;

        Ok(LLMResponse {
            content,
            usage: response
                .usage
                .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
            model: if response.model.is_empty() {
                self.model.clone()
            } else {
                response.model
            },
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAiClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        let options = options.unwrap_or_default();
        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature: options.temperature.or(Some(self.temperature)),
            max_tokens: options.max_tokens,
            stop: options.stop,
        };

        debug!(model = %self.model, base_url = %self.base_url, "Sending chat completion request");

        let response = self
            .request(self.client.post(format!("{}/chat/completions", self.base_url)))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(StepwrightError::llm(format!(
                "Chat completion API error ({}): {}",
                status, error_text
            )));
        }

        let body: CompletionResponse = response.json().await?;
        self.to_llm_response(body)
    }

    async fn is_available(&self) -> bool {
        let result = self
            .request(self.client.get(format!("{}/models", self.base_url)))
            .send()
            .await;
        match result {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Chat completion endpoint unreachable");
                false
            }
        }
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAiClient {
        let mut config = Config::default();
        config.llm.base_url = "https://llm.test/v1/".to_string();
        config.llm.model = "gpt-4o-mini".to_string();
        OpenAiClient::from_config(&config).unwrap()
    }

    #[test]
    fn test_base_url_is_trimmed() {
        assert_eq!(client().base_url, "https://llm.test/v1");
    }

    #[test]
    fn test_response_conversion() {
        let body: CompletionResponse = serde_json::from_str(
            r#"{"model":"gpt-4o-mini","choices":[{"message":{"role":"assistant","content":"[1]"}}],"usage":{"prompt_tokens":3,"completion_tokens":4}}"#,
        )
        .unwrap();
        let response = client().to_llm_response(body).unwrap();
        assert_eq!(response.content, "[1]");
        assert_eq!(response.usage.unwrap().total_tokens, 7);
    }

    #[test]
    fn test_empty_choices_is_error() {
        let body: CompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(client().to_llm_response(body).is_err());
    }
}
