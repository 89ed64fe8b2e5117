//! LLM Provider trait for abstracting different backends
//!
//! The planner only needs text in, text out. Responses are untrusted and go
//! through the plan parser before anything is executed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::Result;

/// A chat message sent to a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Response from an LLM provider
#[derive(Debug, Clone)]
pub struct LLMResponse {
    /// Text content of the response
    pub content: String,
    /// Token usage information
    pub usage: Option<TokenUsage>,
    /// Model that generated the response
    pub model: String,
}

/// Token usage information
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Options for LLM generation
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Temperature for sampling (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Stop sequences
    pub stop: Option<Vec<String>>,
}

/// Trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a response from messages
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse>;

    /// Single planning request: system prompt plus user prompt
    async fn call(&self, system_prompt: &str, user_prompt: &str) -> Result<LLMResponse> {
        let messages = [ChatMessage::system(system_prompt), ChatMessage::user(user_prompt)];
        self.chat(&messages, None).await
    }

    /// Whether the backend answers and serves the configured model
    async fn is_available(&self) -> bool;

    /// Get the provider name
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Echo {
        seen: Mutex<Vec<ChatMessage>>,
    }

    #[async_trait]
    impl LLMProvider for Echo {
        async fn chat(
            &self,
            messages: &[ChatMessage],
            _options: Option<GenerateOptions>,
        ) -> Result<LLMResponse> {
            self.seen.lock().unwrap().extend_from_slice(messages);
            Ok(LLMResponse {
                content: "[]".to_string(),
                usage: Some(TokenUsage::new(10, 2)),
                model: "echo".to_string(),
            })
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[test]
    fn test_call_sends_system_then_user() {
        let provider = Echo {
            seen: Mutex::new(Vec::new()),
        };
        let response = tokio_test::block_on(provider.call("rules", "task")).unwrap();

        assert_eq!(response.usage.unwrap().total_tokens, 12);
        let seen = provider.seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![ChatMessage::system("rules"), ChatMessage::user("task")]
        );
    }
}
