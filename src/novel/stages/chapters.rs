use crate::ai::{Brain, ChatMessage};
use crate::novel::types::{ChapterPlan, CharacterList, EnhancedOutline, PlotType, ThemeSelection};
use crate::types::{NovelError, Result};

/// Story material the chapter breakdown is built from
pub struct ChapterBrief<'a> {
    pub enhanced: &'a EnhancedOutline,
    pub characters: &'a CharacterList,
    pub themes: &'a ThemeSelection,
    pub plot: &'a PlotType,
    pub num_chapters: u32,
}

pub async fn break_into_chapters(brain: &Brain, brief: &ChapterBrief<'_>) -> Result<ChapterPlan> {
    let n = brief.num_chapters;
    let messages = [
        ChatMessage::system(
            "You are a story development expert who takes story outlines and fleshes them \
             out into detailed chapter breakdowns that progress the overall story.",
        ),
        ChatMessage::user(format!(
            "Here's a story outline with all elements. Please flesh this out into EXACTLY \
             {n} chapters that tell the complete story from beginning to end:\n\n\
             STORY OUTLINE:\n{outline}\n\n\
             PLOT TYPE: {plot}\n\n\
             THEMES: {themes}\n\n\
             CHARACTERS:\n{roster}\n\n\
             HUMOR & ROMANCE ELEMENTS:\n{elements}\n\n\
             Please develop this into {n} chapters. For each chapter, provide:\n\n\
             1. TITLE: A compelling chapter title\n\
             2. OPENING SITUATION: Where we are at the start of this chapter (character \
             states, plot situation, setting)\n\
             3. CHAPTER GOAL: What this chapter aims to achieve in progressing the overall \
             story\n\
             4. CLOSING SITUATION: Where we are at the end of this chapter (how things have \
             changed)\n\
             5. KEY EVENTS: A list of the major plot points and story beats that must happen \
             in this chapter\n\n\
             CRITICAL REQUIREMENTS:\n\
             - The chapters must cover the ENTIRE story from beginning to end\n\
             - Chapters are parts of the whole story, not independent narrative arcs\n\
             - Include the themes, plot type, humor and romance elements throughout\n\
             - Ensure proper story pacing and character development across all chapters\n\
             - The final chapter must provide complete closure and resolution\n\
             - Ensure no duplication across the story and across the chapters\n\n\
             Create exactly {n} chapters that progress the complete story.",
            outline = brief.enhanced.outline,
            plot = brief.plot.plot_type,
            themes = brief.themes.joined(),
            roster = brief.characters.roster(),
            elements = brief.enhanced.elements_block(),
        )),
    ];

    let plan: ChapterPlan = brain.chat_structured(&messages).await?;
    normalize(plan, n)
}

/// Enforce the exact chapter count, then number chapters 1..N.
fn normalize(mut plan: ChapterPlan, requested: u32) -> Result<ChapterPlan> {
    if plan.chapters.len() != requested as usize {
        return Err(NovelError::CountMismatch {
            what: "chapters",
            requested: requested as usize,
            returned: plan.chapters.len(),
        });
    }
    for (number, chapter) in (1..).zip(plan.chapters.iter_mut()) {
        chapter.number = number;
    }
    Ok(plan)
}
