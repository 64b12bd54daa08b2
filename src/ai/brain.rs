//! Cached generation engine
//!
//! `Brain` puts the [`FingerprintCache`] in front of a provider, so every
//! distinct call reaches the engine at most once across runs. A call is
//! identified by model, sampling parameters and messages.
//!
//! Call kinds:
//! - `chat` for free text
//! - `chat_structured:<SchemaName>` for schema-shaped output

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::debug;

use super::cache::FingerprintCache;
use super::provider::{ChatMessage, SharedProvider};
use crate::types::{ErrorCategory, NovelError, Result};

/// A type the engine can be asked to produce directly.
pub trait StructuredOutput: Serialize + DeserializeOwned + Send {
    /// Stable schema identity, part of the cache call kind
    const SCHEMA_NAME: &'static str;

    /// JSON schema handed to the provider
    fn schema() -> Value;
}

pub struct Brain {
    provider: SharedProvider,
    cache: FingerprintCache,
}

impl Brain {
    pub fn new(provider: SharedProvider, cache: FingerprintCache) -> Self {
        Self { provider, cache }
    }

    /// `provider:model` identity, included in every fingerprint
    pub fn identity(&self) -> String {
        format!("{}:{}", self.provider.name(), self.provider.model())
    }

    pub fn cache(&self) -> &FingerprintCache {
        &self.cache
    }

    fn request(&self, messages: &[ChatMessage]) -> Value {
        json!({
            "model": self.identity(),
            "sampling": self.provider.sampling(),
            "messages": messages,
        })
    }

    /// Free-text completion
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = self.request(messages);

        self.cache
            .get_or_compute("chat", &request, || async {
                let response = self.provider.generate(messages, &Value::Null).await?;
                debug!(
                    "chat: {} input / {} output tokens",
                    response.usage.input_tokens, response.usage.output_tokens
                );
                Ok(match response.content {
                    Value::String(text) => text,
                    other => other.to_string(),
                })
            })
            .await
    }

    /// Completion parsed into `T`
    pub async fn chat_structured<T: StructuredOutput>(
        &self,
        messages: &[ChatMessage],
    ) -> Result<T> {
        let call_kind = format!("chat_structured:{}", T::SCHEMA_NAME);
        let request = self.request(messages);

        self.cache
            .get_or_compute(&call_kind, &request, || async {
                let response = self.provider.generate(messages, &T::schema()).await?;
                debug!(
                    "{}: {} input / {} output tokens",
                    T::SCHEMA_NAME,
                    response.usage.input_tokens,
                    response.usage.output_tokens
                );
                serde_json::from_value::<T>(response.content).map_err(|e| {
                    NovelError::llm_with_category(
                        ErrorCategory::ParseError,
                        self.provider.name(),
                        format!("Response does not match {}: {}", T::SCHEMA_NAME, e),
                    )
                })
            })
            .await
    }
}
