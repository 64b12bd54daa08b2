use crate::ai::{Brain, ChatMessage};
use crate::novel::types::{CharacterList, Outline, PlotType, ThemeSelection};
use crate::types::Result;

/// Inputs the outline is built from
pub struct OutlineBrief<'a> {
    pub description: &'a str,
    pub plot: &'a PlotType,
    pub themes: &'a ThemeSelection,
    pub characters: &'a CharacterList,
    pub num_chapters: u32,
    pub sections_per_chapter: u32,
}

fn scope_guidance(num_chapters: u32) -> String {
    match num_chapters {
        1 => "This is a complete short story that must have a full beginning, middle, and \
              end within a single chapter."
            .to_string(),
        2..=3 => format!(
            "This is a novella with {} chapters that must tell a complete story with full \
             resolution.",
            num_chapters
        ),
        _ => format!(
            "This is a full novel with {} chapters that should have rich development and \
             multiple plot threads.",
            num_chapters
        ),
    }
}

pub async fn create_outline(brain: &Brain, brief: &OutlineBrief<'_>) -> Result<Outline> {
    let total_sections = brief.num_chapters * brief.sections_per_chapter;

    let messages = [
        ChatMessage::system(
            "You are a master story outliner who creates compelling narrative structures \
             that fit perfectly within the specified scope.",
        ),
        ChatMessage::user(format!(
            "Create a detailed story outline that tells a COMPLETE story within exactly {n} \
             chapters and {total} total sections:\n\n\
             Description: {description}\n\
             Plot Type: {plot}\n\
             Themes: {themes}\n\
             Characters:\n{roster}\n\n\
             SCOPE: {scope}\n\n\
             CRITICAL: This outline must contain a complete story arc with:\n\
             - Clear beginning that establishes setting, characters, and conflict\n\
             - Well-developed middle that explores the conflict and develops characters\n\
             - Satisfying resolution that ties up all plot threads\n\
             - All major plot points, character development, and thematic elements must fit \
             within {n} chapters\n\n\
             The story should feel complete and satisfying at this length, not like a \
             fragment or the beginning of a longer work.",
            n = brief.num_chapters,
            total = total_sections,
            description = brief.description,
            plot = brief.plot.plot_type,
            themes = brief.themes.joined(),
            roster = brief.characters.roster(),
            scope = scope_guidance(brief.num_chapters),
        )),
    ];

    let outline = brain.chat(&messages).await?;
    Ok(Outline { outline })
}
