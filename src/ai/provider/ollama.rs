//! Ollama Local LLM Provider
//!
//! Talks to a locally running Ollama server through `/api/chat`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{ChatMessage, LlmProvider, LlmResponse, ProviderConfig, TokenUsage, prompt_utils};
use crate::ai::validation::extract_json_from_response;
use crate::constants::network;
use crate::types::{ErrorCategory, ErrorClassifier, NovelError, Result};

const DEFAULT_API_BASE: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "gpt-oss:20b";
const PROVIDER: &str = "ollama";

pub struct OllamaProvider {
    api_base: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_base = config
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_base = Self::validate_endpoint(&api_base)?;

        let model = config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(network::CONNECTION_TIMEOUT_SECS))
            .build()
            .map_err(|e| NovelError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_base,
            model,
            temperature: config.temperature,
            client,
        })
    }

    /// Only http/https are accepted; non-local hosts are allowed with a warning.
    fn validate_endpoint(endpoint: &str) -> Result<String> {
        let url = url::Url::parse(endpoint).map_err(|e| {
            NovelError::Config(format!("Invalid Ollama endpoint URL '{}': {}", endpoint, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(NovelError::Config(format!(
                "Ollama endpoint must use http or https scheme, got: {}",
                url.scheme()
            )));
        }

        if let Some(host) = url.host_str()
            && !matches!(host, "localhost" | "127.0.0.1" | "::1" | "[::1]")
        {
            warn!(
                "Ollama endpoint is not localhost: {}. Ensure this is intentional.",
                host
            );
        }

        Ok(url.as_str().trim_end_matches('/').to_string())
    }

    fn build_request(&self, messages: &[ChatMessage], schema: &Value) -> OllamaChatRequest {
        OllamaChatRequest {
            model: self.model.clone(),
            messages: prompt_utils::with_schema_instructions(messages, schema),
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
            },
            format: (!schema.is_null()).then(|| "json".to_string()),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(&self, messages: &[ChatMessage], schema: &Value) -> Result<LlmResponse> {
        info!(
            "Generating with Ollama (model: {}, structured: {})",
            self.model,
            !schema.is_null()
        );

        let start_time = Instant::now();
        let request = self.build_request(messages, schema);
        let url = format!("{}/api/chat", self.api_base);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    NovelError::llm_with_category(
                        ErrorCategory::Network,
                        PROVIDER,
                        format!(
                            "Failed to connect to Ollama at {}. Is Ollama running? Start with: ollama serve",
                            self.api_base
                        ),
                    )
                } else {
                    NovelError::llm(PROVIDER, format!("Ollama request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NovelError::Llm(ErrorClassifier::classify_http_status(
                status.as_u16(),
                &format!("Ollama API error ({}): {}", status, body),
                PROVIDER,
            )));
        }

        let body: OllamaChatResponse = response.json().await.map_err(|e| {
            NovelError::llm_with_category(
                ErrorCategory::ParseError,
                PROVIDER,
                format!("Failed to parse Ollama response: {}", e),
            )
        })?;

        let usage = TokenUsage::new(
            body.prompt_eval_count.unwrap_or(0),
            body.eval_count.unwrap_or(0),
        );
        debug!(
            "Ollama responded in {:?} ({} tokens)",
            start_time.elapsed(),
            usage.total()
        );

        let content = if schema.is_null() {
            Value::String(body.message.content)
        } else {
            extract_json_from_response(&body.message.content)?
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
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: String,
}
