//! Write Command
//!
//! Start a new novel from a description.
//!
//! Usage:
//!   noveliser write "<description>" [--chapters N] [--sections N] [--model M]
//!                   [--author A] [--output DIR] [--overwrite]

use std::path::PathBuf;

use tokio::runtime::Runtime;

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, console_progress};
use crate::novel::NovelRequest;
use crate::storage::RunConfig;
use crate::types::Result;

#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub description: String,
    pub chapters: Option<u32>,
    pub sections: Option<u32>,
    pub model: Option<String>,
    pub author: Option<String>,
    pub output: Option<PathBuf>,
    pub overwrite: bool,
    pub quiet: bool,
}

pub fn run(options: WriteOptions) -> Result<()> {
    let WriteOptions {
        description,
        chapters,
        sections,
        model,
        author,
        output,
        overwrite,
        quiet,
    } = options;

    let mut ctx = CommandContext::load(output)?;
    if let Some(model) = model {
        ctx.config.llm.model = model;
    }
    if let Some(chapters) = chapters {
        ctx.config.novel.num_chapters = chapters;
    }
    if let Some(sections) = sections {
        ctx.config.novel.sections_per_chapter = sections;
    }
    if let Some(author) = author {
        ctx.config.novel.author = author;
    }
    ctx.config.validate()?;

    let config = RunConfig {
        description,
        author: ctx.config.novel.author.clone(),
        model_name: ctx.config.llm.model.clone(),
        num_chapters: ctx.config.novel.num_chapters,
        sections_per_chapter: ctx.config.novel.sections_per_chapter,
    };

    let rt = Runtime::new()?;
    let outcome = rt.block_on(async {
        let (tracker, renderer) = console_progress(quiet).unzip();
        let pipeline = ctx.pipeline(&config.model_name, tracker)?;

        let result = pipeline.write(NovelRequest { config, overwrite }).await;
        drop(pipeline);
        if let Some(renderer) = renderer {
            let _ = renderer.await;
        }
        result
    })?;

    let out = Output::new();
    out.success(&format!("Finished '{}'", outcome.title));
    out.field("document", outcome.document_path.display());
    out.field("sections", outcome.sections_written);
    out.field("facts", outcome.facts);
    out.field("directory", outcome.dir.display());
    Ok(())
}
