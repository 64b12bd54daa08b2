//! Claude Code CLI Provider
//!
//! Runs the local `claude` CLI in print mode. The conversation is flattened
//! into one prompt; structured calls pass the schema via `--json-schema`.

use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use super::{ChatMessage, LlmProvider, LlmResponse, ProviderConfig, TokenUsage, prompt_utils};
use crate::ai::validation::extract_json_from_response;
use crate::types::{ErrorCategory, NovelError, Result};

const DEFAULT_MODEL: &str = "sonnet";
const PROVIDER: &str = "claude-code";

pub struct ClaudeCodeProvider {
    model: String,
    timeout_secs: u64,
}

impl ClaudeCodeProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            model: config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_secs: config.timeout_secs,
        }
    }

    fn build_command(&self, messages: &[ChatMessage], schema: &Value) -> Result<Command> {
        let mut cmd = Command::new("claude");
        cmd.arg("-p")
            .arg(prompt_utils::flatten_messages(messages))
            .arg("--output-format")
            .arg("json")
            .arg("--model")
            .arg(&self.model)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if !schema.is_null() {
            cmd.arg("--json-schema").arg(serde_json::to_string(schema)?);
        }
        Ok(cmd)
    }

    /// Pull the answer out of the CLI's JSON envelope.
    fn extract_content(response: &Value, schema: &Value) -> Result<Value> {
        if !schema.is_null()
            && let Some(structured) = response.get("structured_output")
        {
            return Ok(structured.clone());
        }

        match response.get("result") {
            Some(Value::String(text)) if schema.is_null() => Ok(Value::String(text.clone())),
            Some(Value::String(text)) => extract_json_from_response(text),
            Some(other) if !schema.is_null() && (other.is_object() || other.is_array()) => {
                Ok(other.clone())
            }
            _ => Err(NovelError::llm_with_category(
                ErrorCategory::ParseError,
                PROVIDER,
                "No result in Claude Code response",
            )),
        }
    }

    fn extract_usage(response: &Value) -> TokenUsage {
        let field = |name: &str| {
            response
                .get("usage")
                .and_then(|u| u.get(name))
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32
        };
        TokenUsage::new(field("input_tokens"), field("output_tokens"))
    }
}

#[async_trait]
impl LlmProvider for ClaudeCodeProvider {
    async fn generate(&self, messages: &[ChatMessage], schema: &Value) -> Result<LlmResponse> {
        info!(
            "Generating with Claude Code CLI (model: {}, structured: {})",
            self.model,
            !schema.is_null()
        );

        let child = self.build_command(messages, schema)?.spawn().map_err(|e| {
            NovelError::llm_with_category(
                ErrorCategory::Unavailable,
                PROVIDER,
                format!("Failed to spawn Claude Code CLI: {}. Is it installed?", e),
            )
        })?;

        let output = timeout(
            Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| {
            NovelError::llm_with_category(
                ErrorCategory::Network,
                PROVIDER,
                format!("Claude Code timed out after {}s", self.timeout_secs),
            )
        })?
        .map_err(|e| NovelError::llm(PROVIDER, format!("Claude Code execution failed: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            if let Ok(response) = serde_json::from_str::<Value>(&stdout)
                && response
                    .get("is_error")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false)
            {
                let message = response
                    .get("result")
                    .and_then(|v| v.as_str())
                    .unwrap_or("Unknown API error");
                return Err(NovelError::llm(PROVIDER, message));
            }

            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = if stderr.trim().is_empty() {
                "Process exited with non-zero status"
            } else {
                stderr.trim()
            };
            return Err(NovelError::llm(PROVIDER, message));
        }

        let response: Value = serde_json::from_str(&stdout).map_err(|e| {
            NovelError::llm_with_category(
                ErrorCategory::ParseError,
                PROVIDER,
                format!("Failed to parse Claude Code output: {}", e),
            )
        })?;

        let usage = Self::extract_usage(&response);
        debug!("Claude Code responded ({} tokens)", usage.total());

        Ok(LlmResponse::with_usage(
            Self::extract_content(&response, schema)?,
            usage,
        ))
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }
}
