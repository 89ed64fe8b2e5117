//! LLM module - Language Model integrations
//!
//! Provides the provider abstraction with Ollama as the primary backend and
//! any OpenAI-compatible endpoint as the alternative.

pub mod ollama;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::core::config::{Config, ProviderType};
use crate::core::Result;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use traits::{ChatMessage, GenerateOptions, LLMProvider, LLMResponse, TokenUsage};

/// Create the LLM provider selected in configuration
pub fn create_provider(config: &Config) -> Result<Arc<dyn LLMProvider>> {
    let provider: Arc<dyn LLMProvider> = match config.llm.provider {
        ProviderType::Ollama => Arc::new(OllamaClient::from_config(config)?),
        ProviderType::OpenAi => Arc::new(OpenAiClient::from_config(config)?),
    };
    Ok(provider)
}
