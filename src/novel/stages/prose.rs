use crate::ai::{Brain, ChatMessage};
use crate::novel::types::{Chapter, Section, SectionResult, WritingStyle};
use crate::types::Result;

/// Continuity handed to one section
pub struct ProseContext<'a> {
    pub chapter: &'a Chapter,
    pub section: &'a Section,
    /// Tail of the prose written so far; empty at the start of the story
    pub previous_text: &'a str,
    pub facts: &'a [String],
    pub style: &'a WritingStyle,
}

/// Parse a free-text fact list: one fact per non-empty line, leading
/// bullets stripped, an echoed "Existing facts:" header skipped.
pub fn parse_facts(response: &str) -> Vec<String> {
    response
        .lines()
        .map(str::trim)
        .filter(|line| !line.eq_ignore_ascii_case("existing facts:"))
        .map(|line| {
            line.trim_start_matches(|c: char| matches!(c, '-' | '*' | '•') || c.is_whitespace())
                .to_string()
        })
        .filter(|fact| !fact.is_empty())
        .collect()
}

fn system_prompt(ctx: &ProseContext<'_>) -> String {
    let opening = if ctx.chapter.number == 1 && ctx.section.number == 1 {
        "Start the story naturally."
    } else {
        "Continue from where the previous section left off."
    };

    format!(
        "You are writing a section of a larger novel.\n\n\
         Writing Style:\n{}\n\
         Tone: {}\n\
         Voice: {}\n\
         Pacing: {}\n\n\
         CRITICAL: You are writing ONLY one section, not a complete story.\n\
         {}\n\
         Do NOT conclude or wrap up unless this is explicitly the final section.",
        ctx.style.style_description, ctx.style.tone, ctx.style.voice, ctx.style.pacing, opening
    )
}

fn user_prompt(ctx: &ProseContext<'_>) -> String {
    let previous = if ctx.previous_text.is_empty() {
        "This is the beginning of the story.".to_string()
    } else {
        format!("Previous text:\n{}", ctx.previous_text)
    };
    let facts = if ctx.facts.is_empty() {
        "None yet".to_string()
    } else {
        ctx.facts.join("\n")
    };

    format!(
        "Write the next section of the story:\n\n\
         Chapter Title: {}\n\
         Section Goal: {}\n\
         Key Events: {}\n\n\
         {}\n\n\
         Established Facts:\n{}\n\n\
         Write approximately 1500-2000 words for this section. Maintain continuity and \
         style.\n\
         IMPORTANT: Do NOT include section headings, chapter numbers, or section numbers in \
         your output. Write only the narrative text.",
        ctx.chapter.title, ctx.section.goal, ctx.section.key_events, previous, facts
    )
}

/// Write one section, then extract the new facts it establishes.
pub async fn write_section(brain: &Brain, ctx: &ProseContext<'_>) -> Result<SectionResult> {
    let messages = [
        ChatMessage::system(system_prompt(ctx)),
        ChatMessage::user(user_prompt(ctx)),
    ];
    let text = brain.chat(&messages).await?;

    let fact_messages = [
        ChatMessage::system("You extract concrete facts from text that need to remain consistent."),
        ChatMessage::user(format!(
            "Extract new factual details from this section that should remain consistent:\n\n\
             {}\n\n\
             Existing facts:\n{}\n\n\
             Extract only NEW concrete facts like character descriptions, locations, \
             relationships, objects, etc.\n\
             Return as a simple list.",
            text,
            ctx.facts.join("\n")
        )),
    ];
    let new_facts = parse_facts(&brain.chat(&fact_messages).await?);

    Ok(SectionResult { text, new_facts })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> WritingStyle {
        WritingStyle {
            style_description: "spare".to_string(),
            tone: "wistful".to_string(),
            voice: "third-person limited".to_string(),
            pacing: "measured".to_string(),
            examples: vec![],
        }
    }

    fn chapter(number: u32) -> Chapter {
        Chapter {
            number,
            title: "Low Tide".to_string(),
            opening_situation: "calm".to_string(),
            chapter_goal: "find the map".to_string(),
            closing_situation: "map found".to_string(),
            key_events: vec![],
        }
    }

    fn section(number: u32) -> Section {
        Section {
            number,
            goal: "reach the lamp".to_string(),
            key_events: "stairs give way".to_string(),
        }
    }

    #[test]
    fn test_parse_facts() {
        let response = "Existing facts:\n- Mara keeps the light\n\n* The map is torn \n• Tomas owns a boat\n  -  \nThe tide turns at dusk";
        assert_eq!(
            parse_facts(response),
            vec![
                "Mara keeps the light",
                "The map is torn",
                "Tomas owns a boat",
                "The tide turns at dusk"
            ]
        );
    }

    #[test]
    fn test_parse_facts_keeps_inner_hyphens() {
        assert_eq!(parse_facts("- a well-worn coat"), vec!["a well-worn coat"]);
    }

    #[test]
    fn test_parse_facts_only_skips_the_exact_header() {
        let response = "Existing facts:\nExisting tensions split the village\n- The ferry runs A-*";
        assert_eq!(
            parse_facts(response),
            vec!["Existing tensions split the village", "The ferry runs A-*"]
        );
    }

    #[test]
    fn test_opening_instruction_depends_on_position() {
        let style = style();
        let (first_chapter, later_chapter) = (chapter(1), chapter(2));
        let (first_section, later_section) = (section(1), section(2));

        let opening = ProseContext {
            chapter: &first_chapter,
            section: &first_section,
            previous_text: "",
            facts: &[],
            style: &style,
        };
        assert!(system_prompt(&opening).contains("Start the story naturally."));
        assert!(user_prompt(&opening).contains("This is the beginning of the story."));
        assert!(user_prompt(&opening).contains("None yet"));

        let later = ProseContext {
            chapter: &later_chapter,
            section: &later_section,
            previous_text: "The lamp guttered.",
            facts: &["Mara keeps the light".to_string()],
            style: &style,
        };
        assert!(system_prompt(&later).contains("Continue from where"));
        assert!(user_prompt(&later).contains("Previous text:\nThe lamp guttered."));
        assert!(user_prompt(&later).contains("Mara keeps the light"));
    }
}
