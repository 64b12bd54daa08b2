//! LLM Provider Abstraction
//!
//! Defines the `LlmProvider` trait: the generation engine seen by the rest of
//! the crate. A provider takes a list of chat messages plus an optional JSON
//! schema and returns either free text (`Value::String`) or a schema-shaped
//! JSON value.
//!
//! Providers make exactly one attempt per call. Failures surface as
//! categorized `NovelError::Llm` errors and are never retried here.

mod claude_code;
mod ollama;
mod openai;
mod prompt_utils;

pub use claude_code::ClaudeCodeProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::types::{NovelError, Result};

// =============================================================================
// Messages
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat turn sent to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

// =============================================================================
// LLM Response with Usage Metrics
// =============================================================================

#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// `Value::String` for free text, otherwise the structured object
    pub content: Value,
    pub usage: TokenUsage,
}

impl LlmResponse {
    pub fn with_usage(content: Value, usage: TokenUsage) -> Self {
        Self { content, usage }
    }
}

/// Token usage reported by the provider, logged per call
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Shared provider handle
pub type SharedProvider = Arc<dyn LlmProvider + Send + Sync>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for one provider instance
///
/// API keys are never serialized and are redacted in debug output. Providers
/// convert the key to `SecretString` internally.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider type: "ollama", "openai", "claude-code"
    pub provider: String,
    /// Model name (provider-specific)
    pub model: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::from_llm_config(&LlmConfig::default())
    }
}

impl ProviderConfig {
    /// Split a `provider:model` identity. Only the first colon separates, so
    /// `ollama:gpt-oss:20b` yields provider `ollama`, model `gpt-oss:20b`.
    pub fn parse_model_name(model_name: &str) -> Result<(String, Option<String>)> {
        let (provider, model) = model_name.split_once(':').ok_or_else(|| {
            NovelError::Config(format!(
                "Model '{}' must look like 'provider:model' (e.g. ollama:gpt-oss:20b)",
                model_name
            ))
        })?;
        let model = (!model.is_empty()).then(|| model.to_string());
        Ok((provider.to_string(), model))
    }

    pub fn from_llm_config(llm: &LlmConfig) -> Self {
        let (provider, model) = Self::parse_model_name(&llm.model)
            .unwrap_or_else(|_| (llm.model.clone(), None));
        Self {
            provider,
            model,
            timeout_secs: llm.timeout_secs,
            temperature: llm.temperature,
            api_key: llm.api_key.clone(),
            api_base: llm.api_base.clone(),
        }
    }
}

// =============================================================================
// LLM Provider Trait
// =============================================================================

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send `messages` to the engine.
    ///
    /// With `Value::Null` as schema the response content is a JSON string of
    /// free text; otherwise it is a JSON value shaped by the schema.
    async fn generate(&self, messages: &[ChatMessage], schema: &Value) -> Result<LlmResponse>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;

    /// Sampling parameters sent with every request. They change the output,
    /// so they are part of the cache fingerprint.
    fn sampling(&self) -> Value {
        Value::Null
    }
}

/// Create a shared provider from configuration
pub fn create_provider(config: &ProviderConfig) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "claude-code" => Ok(Arc::new(ClaudeCodeProvider::new(config.clone()))),
        "openai" => Ok(Arc::new(OpenAiProvider::new(config.clone())?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config.clone())?)),
        _ => Err(NovelError::Config(format!(
            "Unknown provider: {}. Supported: ollama, openai, claude-code",
            config.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_model_name_keeps_model_tag() {
        let (provider, model) = ProviderConfig::parse_model_name("ollama:gpt-oss:20b").unwrap();
        assert_eq!(provider, "ollama");
        assert_eq!(model.as_deref(), Some("gpt-oss:20b"));
    }

    #[test]
    fn test_parse_model_name_empty_model() {
        let (provider, model) = ProviderConfig::parse_model_name("claude-code:").unwrap();
        assert_eq!(provider, "claude-code");
        assert!(model.is_none());
    }

    #[test]
    fn test_parse_model_name_requires_provider() {
        assert!(ProviderConfig::parse_model_name("gpt-4o").is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ProviderConfig {
            api_key: Some("sk-very-secret".to_string()),
            ..Default::default()
        };
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("sk-very-secret"));
    }

    #[test]
    fn test_create_provider_unknown() {
        let config = ProviderConfig {
            provider: "carrier-pigeon".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            create_provider(&config),
            Err(NovelError::Config(_))
        ));
    }

    #[test]
    fn test_chat_message_serializes_lowercase_role() {
        let value = serde_json::to_value(ChatMessage::system("be brief")).unwrap();
        assert_eq!(value["role"], "system");
        assert_eq!(value["content"], "be brief");
    }
}
