//! OpenAI API Provider
//!
//! Chat Completions API. Structured calls request `json_object` output and
//! carry the schema in the last user message.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info};

use super::{ChatMessage, LlmProvider, LlmResponse, ProviderConfig, TokenUsage, prompt_utils};
use crate::ai::validation::extract_json_from_response;
use crate::constants::network;
use crate::types::{ErrorCategory, ErrorClassifier, NovelError, Result};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const PROVIDER: &str = "openai";

/// OpenAI API Provider with secure API key handling
pub struct OpenAiProvider {
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                NovelError::Config(
                    "OpenAI API key not found. Set OPENAI_API_KEY or llm.api_key".to_string(),
                )
            })?;

        let api_base = config
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(network::CONNECTION_TIMEOUT_SECS))
            .build()
            .map_err(|e| NovelError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            api_base,
            model: config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: config.temperature,
            client,
        })
    }

    fn build_request(&self, messages: &[ChatMessage], schema: &Value) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: prompt_utils::with_schema_instructions(messages, schema),
            temperature: self.temperature,
            response_format: (!schema.is_null()).then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(&self, messages: &[ChatMessage], schema: &Value) -> Result<LlmResponse> {
        info!(
            "Generating with OpenAI (model: {}, structured: {})",
            self.model,
            !schema.is_null()
        );

        let request = self.build_request(messages, schema);
        let url = format!("{}/chat/completions", self.api_base);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| NovelError::llm(PROVIDER, format!("OpenAI request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NovelError::Llm(ErrorClassifier::classify_http_status(
                status.as_u16(),
                &format!("OpenAI API error ({}): {}", status, body),
                PROVIDER,
            )));
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|e| {
            NovelError::llm_with_category(
                ErrorCategory::ParseError,
                PROVIDER,
                format!("Failed to parse OpenAI response: {}", e),
            )
        })?;

        let usage = body
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                NovelError::llm_with_category(
                    ErrorCategory::ParseError,
                    PROVIDER,
                    "No content in OpenAI response",
                )
            })?;
        debug!("OpenAI responded ({} tokens)", usage.total());

        let content = if schema.is_null() {
            Value::String(text)
        } else {
            extract_json_from_response(&text)?
        };

        Ok(LlmResponse::with_usage(content, usage))
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn sampling(&self) -> Value {
        json!({ "temperature": self.temperature })
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}
