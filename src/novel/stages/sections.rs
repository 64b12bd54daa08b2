use crate::ai::{Brain, ChatMessage};
use crate::novel::types::{Chapter, Section, SectionPlan, SingleSection};
use crate::types::{NovelError, Result};

fn chapter_block(chapter: &Chapter) -> String {
    format!(
        "CHAPTER: {}\n\n\
         OPENING SITUATION: {}\n\
         CHAPTER GOAL: {}\n\
         CLOSING SITUATION: {}\n\
         KEY EVENTS: {}",
        chapter.title,
        chapter.opening_situation,
        chapter.chapter_goal,
        chapter.closing_situation,
        chapter.key_events.join(", ")
    )
}

/// Plan the sections of one chapter.
///
/// A one-section chapter uses a dedicated single-section request.
pub async fn break_into_sections(
    brain: &Brain,
    chapter: &Chapter,
    sections_per_chapter: u32,
) -> Result<SectionPlan> {
    if sections_per_chapter == 1 {
        return single_section(brain, chapter).await;
    }

    let n = sections_per_chapter;
    let messages = [
        ChatMessage::system(format!(
            "You are a writing structure expert who breaks chapters into manageable writing \
             sections. You MUST create exactly {} sections, no more, no less.",
            n
        )),
        ChatMessage::user(format!(
            "Break this chapter into EXACTLY {n} sections for writing:\n\n\
             {chapter}\n\n\
             MANDATORY REQUIREMENT: You MUST create exactly {n} sections. Not {fewer}, not \
             {more}, but exactly {n}.\n\n\
             Each section should:\n\
             1. GOAL: What this section aims to accomplish within the chapter\n\
             2. KEY EVENTS: Specific events and story beats that happen in this section\n\n\
             The sections should progress logically from the opening situation to the \
             closing situation, incorporating all the key events that need to happen in this \
             chapter.\n\n\
             Each section should be a manageable writing unit of approximately 1500-2000 \
             words when written.\n\n\
             CRITICAL: Create exactly {n} sections that collectively tell this complete \
             chapter. Count carefully - you must have exactly {n} sections in your response.",
            chapter = chapter_block(chapter),
            fewer = n.saturating_sub(1),
            more = n + 1,
        )),
    ];

    let plan: SectionPlan = brain.chat_structured(&messages).await?;
    normalize(plan, n)
}

async fn single_section(brain: &Brain, chapter: &Chapter) -> Result<SectionPlan> {
    let messages = [
        ChatMessage::system(
            "You are a writing structure expert who plans how to write a complete chapter \
             as a single section.",
        ),
        ChatMessage::user(format!(
            "Plan how to write this complete chapter as a single section:\n\n\
             {}\n\n\
             Since this is a single section, provide:\n\
             1. GOAL: What this section aims to accomplish (the same as the chapter goal)\n\
             2. KEY EVENTS: All the specific events and story beats that happen to get from \
             opening to closing situation\n\n\
             This section should be a complete chapter of approximately 1500-2000 words when \
             written.",
            chapter_block(chapter)
        )),
    ];

    let single: SingleSection = brain.chat_structured(&messages).await?;
    Ok(SectionPlan {
        sections: vec![Section {
            number: 1,
            goal: single.goal,
            key_events: single.key_events,
        }],
    })
}

/// Enforce the exact section count, then number sections 1..N.
fn normalize(mut plan: SectionPlan, requested: u32) -> Result<SectionPlan> {
    if plan.sections.len() != requested as usize {
        return Err(NovelError::CountMismatch {
            what: "sections",
            requested: requested as usize,
            returned: plan.sections.len(),
        });
    }
    for (number, section) in (1..).zip(plan.sections.iter_mut()) {
        section.number = number;
    }
    Ok(plan)
}
