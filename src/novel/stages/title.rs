use crate::ai::{Brain, ChatMessage};
use crate::novel::types::Title;
use crate::types::{NovelError, Result};

/// Strip surrounding whitespace and quotes from a free-text title.
fn clean_title(raw: &str) -> &str {
    raw.trim().trim_matches(|c| c == '"' || c == '\'').trim()
}

pub async fn generate_title(brain: &Brain, description: &str) -> Result<Title> {
    let messages = [
        ChatMessage::system("You are a creative title generator for novels."),
        ChatMessage::user(format!(
            "Create a compelling, memorable title for this story:\n\n{}\n\n\
             Respond with just the title, no quotes or explanation.",
            description
        )),
    ];

    let raw = brain.chat(&messages).await?;
    let title = clean_title(&raw);
    if title.is_empty() {
        return Err(NovelError::InvalidTitle(raw));
    }

    Ok(Title {
        title: title.to_string(),
    })
}
