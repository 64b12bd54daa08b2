use crate::ai::{Brain, ChatMessage};
use crate::novel::types::{ElementsList, EnhancedOutline};
use crate::types::Result;

fn extraction_prompt(kind: &str, outline: &str) -> [ChatMessage; 2] {
    [
        ChatMessage::system(format!(
            "You extract {} elements from story outlines.",
            kind
        )),
        ChatMessage::user(format!(
            "List the {} elements in this outline:\n{}\n\n\
             Provide a list of 1-5 specific {} elements.",
            kind, outline, kind
        )),
    ]
}

/// Rework the outline with humor and romance, then list what was added.
pub async fn add_humor_and_romance(brain: &Brain, outline: &str) -> Result<EnhancedOutline> {
    let messages = [
        ChatMessage::system(
            "You are a story editor specializing in adding depth through humor and romance.",
        ),
        ChatMessage::user(format!(
            "Review this outline and enhance it with subtle humor and romance:\n\n{}\n\n\
             Add:\n\
             1. At least one humorous subplot or character quirk\n\
             2. A romantic element (doesn't have to be the main focus)\n\
             3. Moments of levity to balance any serious themes\n\n\
             Return the enhanced outline while preserving the core story.",
            outline
        )),
    ];

    let enhanced = brain.chat(&messages).await?;

    let humor: ElementsList = brain
        .chat_structured(&extraction_prompt("humor", &enhanced))
        .await?;
    let romance: ElementsList = brain
        .chat_structured(&extraction_prompt("romance", &enhanced))
        .await?;

    Ok(EnhancedOutline {
        outline: enhanced,
        humor_elements: humor.elements,
        romance_elements: romance.elements,
    })
}
