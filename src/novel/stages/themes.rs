use crate::ai::{Brain, ChatMessage};
use crate::novel::types::{MAX_THEMES, MIN_THEMES, PlotType, ThemeSelection};
use crate::types::{ErrorCategory, NovelError, Result};

pub async fn select_themes(
    brain: &Brain,
    description: &str,
    plot: &PlotType,
) -> Result<ThemeSelection> {
    let messages = [
        ChatMessage::system(
            "You are a literary theme analyst with expertise in identifying universal \
             themes in storytelling.",
        ),
        ChatMessage::user(format!(
            "Given this story description and plot type ({}), select {}-{} universal themes \
             that would best fit this narrative:\n\n{}",
            plot.plot_type, MIN_THEMES, MAX_THEMES, description
        )),
    ];

    let selection: ThemeSelection = brain.chat_structured(&messages).await?;
    check_theme_count(&selection)?;
    Ok(selection)
}

fn check_theme_count(selection: &ThemeSelection) -> Result<()> {
    let count = selection.themes.len();
    if (MIN_THEMES..=MAX_THEMES).contains(&count) {
        Ok(())
    } else {
        Err(NovelError::llm_with_category(
            ErrorCategory::ParseError,
            "themes",
            format!("Expected {}-{} themes, got {}", MIN_THEMES, MAX_THEMES, count),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::novel::types::Theme;

    fn selection(themes: Vec<Theme>) -> ThemeSelection {
        ThemeSelection {
            themes,
            reasoning: "fits".to_string(),
        }
    }

    #[test]
    fn test_theme_count_bounds() {
        assert!(check_theme_count(&selection(vec![Theme::Hope])).is_err());
        assert!(check_theme_count(&selection(vec![Theme::Hope, Theme::Family])).is_ok());
        assert!(
            check_theme_count(&selection(vec![
                Theme::Hope,
                Theme::Family,
                Theme::Courage,
                Theme::Loyalty
            ]))
            .is_err()
        );
    }
}
