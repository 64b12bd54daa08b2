//! Scripted in-memory provider for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use crate::ai::provider::{ChatMessage, LlmProvider, LlmResponse, TokenUsage};
use crate::types::{NovelError, Result};

/// Replies are chosen by schema title for structured calls and by the first
/// matching needle in the messages for free-text calls. A structured queue
/// pops replies in order and repeats its last one.
#[derive(Default)]
pub struct ScriptedProvider {
    default_text: String,
    text_rules: Vec<(String, String)>,
    structured: Mutex<HashMap<String, VecDeque<Value>>>,
    fail_needle: Option<String>,
    temperature: Option<f32>,
    calls: AtomicU32,
    log: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            default_text: "text".to_string(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, reply: &str) -> Self {
        self.default_text = reply.to_string();
        self
    }

    pub fn with_text_rule(mut self, needle: &str, reply: &str) -> Self {
        self.text_rules.push((needle.to_string(), reply.to_string()));
        self
    }

    pub fn with_structured(self, schema_name: &str, reply: Value) -> Self {
        self.structured
            .lock()
            .unwrap()
            .entry(schema_name.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Fail every call whose messages contain `needle`
    pub fn fail_on(mut self, needle: &str) -> Self {
        self.fail_needle = Some(needle.to_string());
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Call kinds in order: schema title, or `chat`
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Joined message contents of every call, in order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn next_structured(&self, name: &str) -> Result<Value> {
        let mut structured = self.structured.lock().unwrap();
        let queue = structured
            .get_mut(name)
            .ok_or_else(|| NovelError::llm("mock", format!("no scripted reply for {}", name)))?;
        let reply = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        reply.ok_or_else(|| NovelError::llm("mock", format!("no scripted reply for {}", name)))
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate(&self, messages: &[ChatMessage], schema: &Value) -> Result<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let joined = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().unwrap().push(joined.clone());

        if let Some(needle) = &self.fail_needle
            && joined.contains(needle.as_str())
        {
            return Err(NovelError::llm("mock", "scripted failure: 503 unavailable"));
        }

        let usage = TokenUsage::new(joined.len() as u32 / 4, 10);
        if let Some(name) = schema.get("title").and_then(Value::as_str) {
            self.log.lock().unwrap().push(name.to_string());
            return Ok(LlmResponse::with_usage(self.next_structured(name)?, usage));
        }

        self.log.lock().unwrap().push("chat".to_string());
        let reply = self
            .text_rules
            .iter()
            .find(|(needle, _)| joined.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.default_text.clone());
        Ok(LlmResponse::with_usage(Value::String(reply), usage))
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "scripted"
    }

    fn sampling(&self) -> Value {
        self.temperature
            .map_or(Value::Null, |t| serde_json::json!({ "temperature": t }))
    }
}
