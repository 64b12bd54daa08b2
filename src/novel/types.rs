//! Stage artifacts
//!
//! Every stage result is one of these types. The same type is written to the
//! step record and read back on resume, and structured ones also carry the
//! schema handed to the generation engine.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::recorder::Summary;
use crate::ai::StructuredOutput;
use crate::constants::writing::SUMMARY_PREVIEW_CHARS;
use crate::types::preview;

/// Enum whose serialized form is a human-readable label.
macro_rules! labelled_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $label)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            fn labels() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.label()).collect()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

fn object_schema(title: &str, properties: Value, required: &[&str]) -> Value {
    json!({
        "title": title,
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn string_list() -> Value {
    json!({"type": "array", "items": {"type": "string"}})
}

// =============================================================================
// Title
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
    pub title: String,
}

impl Summary for Title {
    fn summary(&self) -> String {
        self.title.clone()
    }
}

// =============================================================================
// Plot type
// =============================================================================

labelled_enum! {
    /// Booker's seven basic plots
    PlotTypeKind {
        OvercomingTheMonster => "Overcoming the Monster",
        RagsToRiches => "Rags to Riches",
        TheQuest => "The Quest",
        VoyageAndReturn => "Voyage and Return",
        Comedy => "Comedy",
        Tragedy => "Tragedy",
        Rebirth => "Rebirth",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotType {
    pub plot_type: PlotTypeKind,
    pub reasoning: String,
}

impl StructuredOutput for PlotType {
    const SCHEMA_NAME: &'static str = "PlotType";

    fn schema() -> Value {
        object_schema(
            Self::SCHEMA_NAME,
            json!({
                "plot_type": {
                    "type": "string",
                    "enum": PlotTypeKind::labels(),
                    "description": "The basic plot type that best fits the story"
                },
                "reasoning": {
                    "type": "string",
                    "description": "Explanation of why this plot type was chosen"
                }
            }),
            &["plot_type", "reasoning"],
        )
    }
}

impl Summary for PlotType {
    fn summary(&self) -> String {
        self.plot_type.to_string()
    }
}

// =============================================================================
// Themes
// =============================================================================

labelled_enum! {
    Theme {
        LoveAndRelationships => "Love and Relationships",
        GoodVsEvil => "Good vs Evil",
        ComingOfAge => "Coming of Age",
        DeathAndLoss => "Death and Loss",
        PowerAndCorruption => "Power and Corruption",
        Redemption => "Redemption",
        Survival => "Survival",
        IdentityAndSelfDiscovery => "Identity and Self-Discovery",
        FreedomVsOppression => "Freedom vs Oppression",
        Sacrifice => "Sacrifice",
        Justice => "Justice",
        Betrayal => "Betrayal",
        Forgiveness => "Forgiveness",
        Family => "Family",
        Friendship => "Friendship",
        Courage => "Courage",
        Loyalty => "Loyalty",
        TruthVsDeception => "Truth vs Deception",
        Hope => "Hope",
        Revenge => "Revenge",
        TimeAndChange => "Time and Change",
        TraditionVsProgress => "Tradition vs Progress",
        NatureAndHumanity => "Nature and Humanity",
        ScienceAndEthics => "Science and Ethics",
        CulturalExchange => "Cultural Exchange",
        FateVsFreeWill => "Fate vs Free Will",
        IsolationAndBelonging => "Isolation and Belonging",
    }
}

pub const MIN_THEMES: usize = 2;
pub const MAX_THEMES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeSelection {
    pub themes: Vec<Theme>,
    pub reasoning: String,
}

impl ThemeSelection {
    pub fn labels(&self) -> Vec<&'static str> {
        self.themes.iter().map(|t| t.label()).collect()
    }

    pub fn joined(&self) -> String {
        self.labels().join(", ")
    }
}

impl StructuredOutput for ThemeSelection {
    const SCHEMA_NAME: &'static str = "ThemeSelection";

    fn schema() -> Value {
        object_schema(
            Self::SCHEMA_NAME,
            json!({
                "themes": {
                    "type": "array",
                    "items": {"type": "string", "enum": Theme::labels()},
                    "minItems": MIN_THEMES,
                    "maxItems": MAX_THEMES,
                    "description": "2-3 universal themes that best fit the story"
                },
                "reasoning": {
                    "type": "string",
                    "description": "Explanation of why these themes were chosen"
                }
            }),
            &["themes", "reasoning"],
        )
    }
}

impl Summary for ThemeSelection {
    fn summary(&self) -> String {
        self.joined()
    }
}

// =============================================================================
// Characters
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterRole {
    Protagonist,
    Antagonist,
    Supporting,
    Minor,
}

impl std::fmt::Display for CharacterRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::types::enum_to_str(self))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub biography: String,
    pub role: CharacterRole,
    pub traits: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterList {
    pub characters: Vec<Character>,
}

impl CharacterList {
    /// `- Name (role): biography` per line
    pub fn roster(&self) -> String {
        self.characters
            .iter()
            .map(|c| format!("- {} ({}): {}", c.name, c.role, c.biography))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl StructuredOutput for CharacterList {
    const SCHEMA_NAME: &'static str = "CharacterList";

    fn schema() -> Value {
        let character = object_schema(
            "Character",
            json!({
                "name": {"type": "string"},
                "biography": {"type": "string"},
                "role": {
                    "type": "string",
                    "enum": ["protagonist", "antagonist", "supporting", "minor"]
                },
                "traits": string_list()
            }),
            &["name", "biography", "role", "traits"],
        );
        object_schema(
            Self::SCHEMA_NAME,
            json!({"characters": {"type": "array", "items": character}}),
            &["characters"],
        )
    }
}

impl Summary for CharacterList {
    fn summary(&self) -> String {
        self.characters
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// =============================================================================
// Outline
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    pub outline: String,
}

impl Summary for Outline {
    fn summary(&self) -> String {
        preview(&self.outline, SUMMARY_PREVIEW_CHARS)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementsList {
    pub elements: Vec<String>,
}

impl StructuredOutput for ElementsList {
    const SCHEMA_NAME: &'static str = "ElementsList";

    fn schema() -> Value {
        object_schema(
            Self::SCHEMA_NAME,
            json!({"elements": string_list()}),
            &["elements"],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedOutline {
    pub outline: String,
    pub humor_elements: Vec<String>,
    pub romance_elements: Vec<String>,
}

impl EnhancedOutline {
    /// Humor and romance elements as a bulleted block
    pub fn elements_block(&self) -> String {
        let bullets = |items: &[String]| {
            items
                .iter()
                .map(|i| format!("- {}", i))
                .collect::<Vec<_>>()
                .join("\n")
        };
        format!(
            "Humor:\n{}\n\nRomance:\n{}",
            bullets(&self.humor_elements),
            bullets(&self.romance_elements)
        )
    }
}

impl Summary for EnhancedOutline {
    fn summary(&self) -> String {
        format!(
            "{} humor, {} romance elements",
            self.humor_elements.len(),
            self.romance_elements.len()
        )
    }
}

// =============================================================================
// Writing style
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WritingStyle {
    pub style_description: String,
    pub tone: String,
    pub voice: String,
    pub pacing: String,
    pub examples: Vec<String>,
}

impl StructuredOutput for WritingStyle {
    const SCHEMA_NAME: &'static str = "WritingStyle";

    fn schema() -> Value {
        object_schema(
            Self::SCHEMA_NAME,
            json!({
                "style_description": {"type": "string"},
                "tone": {"type": "string"},
                "voice": {"type": "string"},
                "pacing": {"type": "string"},
                "examples": string_list()
            }),
            &["style_description", "tone", "voice", "pacing", "examples"],
        )
    }
}

impl Summary for WritingStyle {
    fn summary(&self) -> String {
        format!("{}, {}", self.tone, self.voice)
    }
}

// =============================================================================
// Chapters and sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub number: u32,
    pub title: String,
    pub opening_situation: String,
    pub chapter_goal: String,
    pub closing_situation: String,
    pub key_events: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterPlan {
    pub chapters: Vec<Chapter>,
}

impl StructuredOutput for ChapterPlan {
    const SCHEMA_NAME: &'static str = "ChapterPlan";

    fn schema() -> Value {
        let chapter = object_schema(
            "Chapter",
            json!({
                "number": {"type": "integer", "description": "The chapter number"},
                "title": {"type": "string", "description": "A compelling chapter title"},
                "opening_situation": {
                    "type": "string",
                    "description": "Where we are at the start of the chapter: character states, plot situation, setting"
                },
                "chapter_goal": {
                    "type": "string",
                    "description": "What this chapter aims to achieve in the overall story arc"
                },
                "closing_situation": {
                    "type": "string",
                    "description": "Where we are at the end of the chapter and how things have changed"
                },
                "key_events": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Major plot points and story beats that must happen in this chapter"
                }
            }),
            &[
                "number",
                "title",
                "opening_situation",
                "chapter_goal",
                "closing_situation",
                "key_events",
            ],
        );
        object_schema(
            Self::SCHEMA_NAME,
            json!({"chapters": {"type": "array", "items": chapter}}),
            &["chapters"],
        )
    }
}

impl Summary for ChapterPlan {
    fn summary(&self) -> String {
        self.chapters
            .iter()
            .map(|c| format!("{}. {}", c.number, c.title))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub number: u32,
    pub goal: String,
    pub key_events: String,
}

fn section_properties() -> Value {
    json!({
        "goal": {
            "type": "string",
            "description": "What this section aims to accomplish within the chapter"
        },
        "key_events": {
            "type": "string",
            "description": "Specific events and story beats that happen in this section"
        }
    })
}

/// Plan for a chapter written as one section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleSection {
    pub goal: String,
    pub key_events: String,
}

impl StructuredOutput for SingleSection {
    const SCHEMA_NAME: &'static str = "SingleSection";

    fn schema() -> Value {
        object_schema(
            Self::SCHEMA_NAME,
            section_properties(),
            &["goal", "key_events"],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionPlan {
    pub sections: Vec<Section>,
}

impl StructuredOutput for SectionPlan {
    const SCHEMA_NAME: &'static str = "SectionPlan";

    fn schema() -> Value {
        let mut properties = section_properties();
        if let Some(map) = properties.as_object_mut() {
            map.insert(
                "number".to_string(),
                json!({"type": "integer", "description": "The section number within the chapter"}),
            );
        }
        let section = object_schema("Section", properties, &["number", "goal", "key_events"]);
        object_schema(
            Self::SCHEMA_NAME,
            json!({"sections": {"type": "array", "items": section}}),
            &["sections"],
        )
    }
}

impl Summary for SectionPlan {
    fn summary(&self) -> String {
        format!("{} sections", self.sections.len())
    }
}

// =============================================================================
// Prose
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionResult {
    pub text: String,
    pub new_facts: Vec<String>,
}

impl Summary for SectionResult {
    fn summary(&self) -> String {
        format!(
            "{} words, {} new facts",
            self.text.split_whitespace().count(),
            self.new_facts.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip_through_serde() {
        let plot: PlotTypeKind = serde_json::from_str("\"Voyage and Return\"").unwrap();
        assert_eq!(plot, PlotTypeKind::VoyageAndReturn);
        assert_eq!(
            serde_json::to_string(&Theme::IdentityAndSelfDiscovery).unwrap(),
            "\"Identity and Self-Discovery\""
        );
    }

    #[test]
    fn test_catalogue_sizes() {
        assert_eq!(PlotTypeKind::ALL.len(), 7);
        assert_eq!(Theme::ALL.len(), 27);
    }

    #[test]
    fn test_unknown_theme_rejected() {
        let result: std::result::Result<ThemeSelection, _> = serde_json::from_value(json!({
            "themes": ["Love and Relationships", "Space Pirates"],
            "reasoning": "x"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_schemas_carry_their_name() {
        assert_eq!(PlotType::schema()["title"], "PlotType");
        assert_eq!(ChapterPlan::schema()["title"], "ChapterPlan");
        assert_eq!(
            SectionPlan::schema()["properties"]["sections"]["items"]["required"][0],
            "number"
        );
        assert_eq!(ThemeSelection::schema()["properties"]["themes"]["maxItems"], 3);
    }

    #[test]
    fn test_roster_format() {
        let list = CharacterList {
            characters: vec![Character {
                name: "Mara".to_string(),
                biography: "A lighthouse keeper.".to_string(),
                role: CharacterRole::Protagonist,
                traits: vec!["stubborn".to_string()],
            }],
        };
        assert_eq!(list.roster(), "- Mara (protagonist): A lighthouse keeper.");
        assert_eq!(list.summary(), "Mara");
    }

    #[test]
    fn test_elements_block() {
        let enhanced = EnhancedOutline {
            outline: "o".to_string(),
            humor_elements: vec!["a talking gull".to_string()],
            romance_elements: vec!["letters in bottles".to_string()],
        };
        assert_eq!(
            enhanced.elements_block(),
            "Humor:\n- a talking gull\n\nRomance:\n- letters in bottles"
        );
    }
}
