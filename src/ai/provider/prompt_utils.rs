//! Prompt building utilities for LLM providers.
//!
//! Providers without native schema enforcement get the schema spelled out in
//! the last user message.

use serde_json::Value;

use super::{ChatMessage, Role};

/// Append JSON schema instructions to a prompt.
/// Returns the original prompt if schema is null.
pub fn build_schema_prompt(user_prompt: &str, schema: &Value) -> String {
    if schema.is_null() {
        return user_prompt.to_string();
    }

    let schema_str = serde_json::to_string_pretty(schema).unwrap_or_default();
    format!(
        "{}\n\n---\n\nRespond with valid JSON matching this schema:\n```json\n{}\n```\n\nRespond ONLY with valid JSON, no explanation.",
        user_prompt, schema_str
    )
}

/// Copy of `messages` with schema instructions appended to the last user turn.
pub fn with_schema_instructions(messages: &[ChatMessage], schema: &Value) -> Vec<ChatMessage> {
    let mut out = messages.to_vec();
    if schema.is_null() {
        return out;
    }

    match out.iter_mut().rev().find(|m| m.role == Role::User) {
        Some(last_user) => last_user.content = build_schema_prompt(&last_user.content, schema),
        None => out.push(ChatMessage::user(build_schema_prompt("", schema))),
    }
    out
}

/// Flatten a conversation into one prompt for single-prompt backends.
pub fn flatten_messages(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| match m.role {
            Role::System => format!("[System]\n{}", m.content),
            Role::User => m.content.clone(),
            Role::Assistant => format!("[Assistant]\n{}", m.content),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_schema_prompt_null_schema() {
        let prompt = "Name the novel";
        assert_eq!(build_schema_prompt(prompt, &Value::Null), prompt);
    }

    #[test]
    fn test_schema_goes_to_last_user_message() {
        let messages = vec![
            ChatMessage::system("You are a novelist."),
            ChatMessage::user("Pick a plot."),
        ];
        let schema = json!({"type": "object"});
        let out = with_schema_instructions(&messages, &schema);

        assert_eq!(out[0].content, "You are a novelist.");
        assert!(out[1].content.starts_with("Pick a plot."));
        assert!(out[1].content.contains("Respond ONLY with valid JSON"));
    }

    #[test]
    fn test_free_text_messages_unchanged() {
        let messages = vec![ChatMessage::user("Write.")];
        assert_eq!(with_schema_instructions(&messages, &Value::Null), messages);
    }

    #[test]
    fn test_flatten_messages() {
        let messages = vec![ChatMessage::system("Rules"), ChatMessage::user("Go")];
        assert_eq!(flatten_messages(&messages), "[System]\nRules\n\nGo");
    }
}
