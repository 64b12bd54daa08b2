//! Manuscript Packaging
//!
//! The final stage hands the written prose to a [`Packager`]. The bundled
//! [`MarkdownPackager`] writes one Markdown manuscript per run; it does not
//! produce a cover.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::recorder::Summary;
use super::types::Chapter;
use crate::storage::title_slug;
use crate::types::Result;

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n").expect("static pattern"));

/// Prose keyed by chapter number, then section number
pub type ProseByChapter = BTreeMap<u32, BTreeMap<u32, String>>;

pub struct PackageRequest<'a> {
    pub title: &'a str,
    pub author: &'a str,
    pub chapters: &'a [Chapter],
    pub text_by_section_by_chapter: &'a ProseByChapter,
    pub output_dir: &'a Path,
    pub themes: Vec<&'static str>,
    pub plot_type: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageResult {
    pub document_path: PathBuf,
    pub cover_path: Option<PathBuf>,
}

impl Summary for PackageResult {
    fn summary(&self) -> String {
        self.document_path.display().to_string()
    }
}

#[async_trait]
pub trait Packager: Send + Sync {
    async fn assemble(&self, request: PackageRequest<'_>) -> Result<PackageResult>;
}

// =============================================================================
// Markdown
// =============================================================================

#[derive(Debug, Default)]
pub struct MarkdownPackager;

/// Re-flow a section into paragraphs separated by exactly one blank line.
fn paragraphs(text: &str) -> Vec<&str> {
    BLANK_LINES
        .split(text.trim())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

pub fn render_markdown(request: &PackageRequest<'_>) -> String {
    let mut out = format!("# {}\n\n*by {}*\n", request.title, request.author);
    if !request.plot_type.is_empty() || !request.themes.is_empty() {
        out.push_str(&format!(
            "\n> {} · {}\n",
            request.plot_type,
            request.themes.join(", ")
        ));
    }

    let with_headings = request.chapters.len() > 1;
    for chapter in request.chapters {
        if with_headings {
            out.push_str(&format!(
                "\n## Chapter {}: {}\n",
                chapter.number, chapter.title
            ));
        }

        let Some(sections) = request.text_by_section_by_chapter.get(&chapter.number) else {
            continue;
        };
        for text in sections.values() {
            for paragraph in paragraphs(text) {
                out.push('\n');
                out.push_str(paragraph);
                out.push('\n');
            }
        }
    }
    out
}

#[async_trait]
impl Packager for MarkdownPackager {
    async fn assemble(&self, request: PackageRequest<'_>) -> Result<PackageResult> {
        let path = request
            .output_dir
            .join(format!("{}.md", title_slug(request.title)?));

        tokio::fs::create_dir_all(request.output_dir).await?;
        tokio::fs::write(&path, render_markdown(&request)).await?;

        info!("Wrote manuscript {}", path.display());
        Ok(PackageResult {
            document_path: path,
            cover_path: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn chapter(number: u32, title: &str) -> Chapter {
        Chapter {
            number,
            title: title.to_string(),
            opening_situation: String::new(),
            chapter_goal: String::new(),
            closing_situation: String::new(),
            key_events: vec![],
        }
    }

    fn prose(entries: &[(u32, u32, &str)]) -> ProseByChapter {
        let mut prose = ProseByChapter::new();
        for (c, s, text) in entries {
            prose.entry(*c).or_default().insert(*s, text.to_string());
        }
        prose
    }

    #[test]
    fn test_single_chapter_has_no_heading() {
        let chapters = [chapter(1, "Low Tide")];
        let text = prose(&[(1, 1, "First para.\n\n\n  Second para.  ")]);
        let request = PackageRequest {
            title: "The Keeper",
            author: "Anonymous",
            chapters: &chapters,
            text_by_section_by_chapter: &text,
            output_dir: Path::new("."),
            themes: vec!["Hope"],
            plot_type: "The Quest",
        };

        let md = render_markdown(&request);
        assert!(md.starts_with("# The Keeper\n\n*by Anonymous*\n"));
        assert!(!md.contains("## Chapter"));
        assert!(md.contains("\nFirst para.\n\nSecond para.\n"));
    }

    #[test]
    fn test_chapters_rendered_in_order_with_headings() {
        let chapters = [chapter(1, "Low Tide"), chapter(2, "High Water")];
        let text = prose(&[(2, 1, "Later."), (1, 2, "Middle."), (1, 1, "Start.")]);
        let request = PackageRequest {
            title: "The Keeper",
            author: "Anonymous",
            chapters: &chapters,
            text_by_section_by_chapter: &text,
            output_dir: Path::new("."),
            themes: vec![],
            plot_type: "",
        };

        let md = render_markdown(&request);
        let needles = ["## Chapter 1: Low Tide", "Start.", "Middle.", "## Chapter 2", "Later."];
        let order: Vec<usize> = needles
            .iter()
            .map(|needle| md.find(needle).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_assemble_writes_slugged_file() {
        let temp_dir = TempDir::new().unwrap();
        let chapters = [chapter(1, "Low Tide")];
        let text = prose(&[(1, 1, "Once.")]);

        let result = MarkdownPackager
            .assemble(PackageRequest {
                title: "The Keeper's Map",
                author: "Anonymous",
                chapters: &chapters,
                text_by_section_by_chapter: &text,
                output_dir: temp_dir.path(),
                themes: vec![],
                plot_type: "Comedy",
            })
            .await
            .unwrap();

        assert_eq!(result.document_path, temp_dir.path().join("The_Keepers_Map.md"));
        assert!(result.cover_path.is_none());
        assert!(result.document_path.exists());
    }
}
