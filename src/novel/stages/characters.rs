use crate::ai::{Brain, ChatMessage};
use crate::novel::types::{CharacterList, PlotType, ThemeSelection};
use crate::types::{ErrorCategory, NovelError, Result};

const NAME_HINTS: &[&str] = &["character", "named"];

/// Whether the description already names or describes its characters
fn mentions_characters(description: &str) -> bool {
    let lowered = description.to_lowercase();
    NAME_HINTS.iter().any(|hint| lowered.contains(hint))
}

pub async fn create_characters(
    brain: &Brain,
    description: &str,
    plot: &PlotType,
    themes: &ThemeSelection,
) -> Result<CharacterList> {
    let keep_names = if mentions_characters(description) {
        "\n\nIMPORTANT: The description contains specific character names or character \
         information. You MUST use these exact names and any provided character details \
         from the description. Do not create entirely new character names if names are \
         already provided in the description."
    } else {
        ""
    };

    let messages = [
        ChatMessage::system(
            "You are a character creation expert. Create compelling characters with distinct \
             personalities and clear roles. If character names are provided in the \
             description, you MUST use those exact names.",
        ),
        ChatMessage::user(format!(
            "Create 3-8 characters for this story:\n\n\
             Description: {}\n\
             Plot Type: {}\n\
             Themes: {}\n\n\
             Create characters with full biographies and personality traits.{}",
            description,
            plot.plot_type,
            themes.joined(),
            keep_names
        )),
    ];

    let list: CharacterList = brain.chat_structured(&messages).await?;
    if list.characters.is_empty() {
        return Err(NovelError::llm_with_category(
            ErrorCategory::ParseError,
            "characters",
            "The model returned no characters",
        ));
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mentions_characters() {
        assert!(mentions_characters("A keeper named Mara"));
        assert!(mentions_characters("Here are the CHARACTERS: Mara, Tomas"));
        assert!(!mentions_characters("A lighthouse on a stormy coast"));
    }
}
