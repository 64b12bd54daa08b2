//! Generation stages
//!
//! One module per stage. Each stage builds its prompt, asks the [`Brain`]
//! and validates the answer; persistence and resume are the recorder's job.
//!
//! [`Brain`]: crate::ai::Brain

pub mod chapters;
pub mod characters;
pub mod enhancement;
pub mod outline;
pub mod plot;
pub mod prose;
pub mod sections;
pub mod style;
pub mod themes;
pub mod title;

pub use chapters::{ChapterBrief, break_into_chapters};
pub use characters::create_characters;
pub use enhancement::add_humor_and_romance;
pub use outline::{OutlineBrief, create_outline};
pub use plot::determine_plot_type;
pub use prose::{ProseContext, parse_facts, write_section};
pub use sections::break_into_sections;
pub use style::define_writing_style;
pub use themes::select_themes;
pub use title::generate_title;
