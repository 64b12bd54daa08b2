use crate::ai::{Brain, ChatMessage};
use crate::constants::writing::STYLE_OUTLINE_CHARS;
use crate::novel::types::{ThemeSelection, WritingStyle};
use crate::types::{Result, head_chars};

pub async fn define_writing_style(
    brain: &Brain,
    outline: &str,
    themes: &ThemeSelection,
) -> Result<WritingStyle> {
    let messages = [
        ChatMessage::system("You are a writing style consultant."),
        ChatMessage::user(format!(
            "Define a consistent writing style for this novel:\n\n\
             Themes: {}\n\
             Story outline: {}...\n\n\
             Provide specific guidance on:\n\
             - Overall style description\n\
             - Tone (e.g., serious, light, dramatic, humorous)\n\
             - Voice (e.g., first-person, third-person limited, omniscient)\n\
             - Pacing (e.g., fast-paced, measured, varies by section)\n\
             - 2-3 example sentences showing the style",
            themes.joined(),
            head_chars(outline, STYLE_OUTLINE_CHARS)
        )),
    ];

    brain.chat_structured(&messages).await
}
