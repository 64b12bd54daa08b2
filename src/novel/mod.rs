//! Novel Pipeline
//!
//! Drives one run from a story description to a packaged manuscript:
//!
//! ```text
//! title → plot type → themes → characters → outline → humor & romance
//!       → writing style → chapters → (sections → prose)* per chapter → package
//! ```
//!
//! Every stage goes through the [`StageRecorder`], so an interrupted run
//! resumes at the first stage without a record. Prose is written strictly in
//! order: each section sees the tail of everything written so far and the
//! full fact ledger.

pub mod package;
pub mod recorder;
pub mod stages;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::ai::Brain;
use crate::cli::progress::ProgressTracker;
use crate::constants::writing::DEFAULT_PROSE_WINDOW_CHARS;
use crate::storage::{RunConfig, RunStore};
use crate::types::{NovelError, Result, tail_chars};

pub use package::{MarkdownPackager, PackageRequest, PackageResult, Packager, ProseByChapter};
pub use recorder::{RunContext, StageRecorder, StageWork, StepRegistry, Summary, step_slug};
pub use types::*;

use stages::{ChapterBrief, OutlineBrief, ProseContext};

/// A fresh run request
#[derive(Debug, Clone)]
pub struct NovelRequest {
    pub config: RunConfig,
    /// Discard an existing run with the same title instead of failing
    pub overwrite: bool,
}

/// A finished run
#[derive(Debug, Clone)]
pub struct NovelOutcome {
    pub title: String,
    pub dir: PathBuf,
    pub document_path: PathBuf,
    pub cover_path: Option<PathBuf>,
    pub sections_written: usize,
    pub facts: usize,
}

pub struct NovelPipeline {
    brain: Brain,
    store: RunStore,
    packager: Arc<dyn Packager>,
    prose_window: usize,
    progress: Option<ProgressTracker>,
}

impl NovelPipeline {
    pub fn new(brain: Brain, store: RunStore) -> Self {
        Self {
            brain,
            store,
            packager: Arc::new(MarkdownPackager),
            prose_window: DEFAULT_PROSE_WINDOW_CHARS,
            progress: None,
        }
    }

    pub fn with_packager(mut self, packager: Arc<dyn Packager>) -> Self {
        self.packager = packager;
        self
    }

    pub fn with_prose_window(mut self, chars: usize) -> Self {
        self.prose_window = chars;
        self
    }

    pub fn with_progress(mut self, progress: ProgressTracker) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn store(&self) -> &RunStore {
        &self.store
    }

    /// Start a new run.
    ///
    /// The title is generated first since it names the working directory.
    pub async fn write(&self, request: NovelRequest) -> Result<NovelOutcome> {
        let config = request.config;
        config.validate()?;
        let title = stages::generate_title(&self.brain, &config.description).await?;

        let dir = match self.store.create(&title.title, &config).await {
            Ok((_, dir)) => dir,
            Err(NovelError::RunExists(dir)) if request.overwrite => {
                warn!("Overwriting existing run in {}", dir.display());
                self.store.reset(&dir).await?;
                self.store.create(&title.title, &config).await?.1
            }
            Err(e) => return Err(e),
        };

        let recorder = self.recorder(RunContext::fresh(&dir));
        self.drive(recorder, &config, StageWork::Ready(title)).await
    }

    /// Continue a run from its working directory.
    pub async fn resume(&self, dir: &Path) -> Result<NovelOutcome> {
        self.store.require(dir).await?.config().validate()?;
        let record = self.store.mark_resumed(dir).await?;
        info!(
            "Resuming '{}' ({} steps recorded)",
            record.title,
            record.completed_steps.len()
        );

        let title = Title {
            title: record.title.clone(),
        };
        let recorder = self.recorder(RunContext::resuming(dir));
        self.drive(recorder, &record.config(), StageWork::Ready(title))
            .await
    }

    fn recorder(&self, context: RunContext) -> StageRecorder {
        StageRecorder::new(self.store.clone(), context).with_progress(self.progress.clone())
    }

    /// Run every stage; on failure mark the run failed and return the error.
    async fn drive(
        &self,
        mut recorder: StageRecorder,
        config: &RunConfig,
        title: StageWork<'_, Title>,
    ) -> Result<NovelOutcome> {
        if let Some(progress) = &self.progress {
            progress.start();
        }

        let dir = recorder.dir().to_path_buf();
        match self.run_stages(&mut recorder, config, title).await {
            Ok(outcome) => {
                if let Some(progress) = &self.progress {
                    progress.finish(true, &format!("'{}' finished", outcome.title));
                }
                Ok(outcome)
            }
            Err(e) => {
                if let Err(mark) = self.store.mark_failed(&dir, &e.to_string()).await {
                    warn!("Could not mark {} failed: {}", dir.display(), mark);
                }
                if let Some(progress) = &self.progress {
                    progress.finish(false, &format!("Run failed: {}", e));
                }
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        recorder: &mut StageRecorder,
        config: &RunConfig,
        title: StageWork<'_, Title>,
    ) -> Result<NovelOutcome> {
        let brain = &self.brain;
        let description = config.description.as_str();
        let dir = recorder.dir().to_path_buf();

        let title = recorder.record("Generate title", None, title).await?;

        let plot = recorder
            .record(
                "Determine plot type",
                Some(&title),
                StageWork::deferred(stages::determine_plot_type(brain, description)),
            )
            .await?;

        let themes = recorder
            .record(
                "Select themes",
                Some(&plot),
                StageWork::deferred(stages::select_themes(brain, description, &plot)),
            )
            .await?;

        let characters = recorder
            .record(
                "Create characters",
                Some(&themes),
                StageWork::deferred(stages::create_characters(
                    brain,
                    description,
                    &plot,
                    &themes,
                )),
            )
            .await?;

        let brief = OutlineBrief {
            description,
            plot: &plot,
            themes: &themes,
            characters: &characters,
            num_chapters: config.num_chapters,
            sections_per_chapter: config.sections_per_chapter,
        };
        let outline = recorder
            .record(
                "Create outline",
                Some(&characters),
                StageWork::deferred(stages::create_outline(brain, &brief)),
            )
            .await?;

        let enhanced = recorder
            .record(
                "Add humor and romance",
                Some(&outline),
                StageWork::deferred(stages::add_humor_and_romance(brain, &outline.outline)),
            )
            .await?;

        let style = recorder
            .record(
                "Define writing style",
                Some(&enhanced),
                StageWork::deferred(stages::define_writing_style(
                    brain,
                    &enhanced.outline,
                    &themes,
                )),
            )
            .await?;

        let brief = ChapterBrief {
            enhanced: &enhanced,
            characters: &characters,
            themes: &themes,
            plot: &plot,
            num_chapters: config.num_chapters,
        };
        let plan = recorder
            .record(
                &format!("Break into {} chapters", config.num_chapters),
                Some(&style),
                StageWork::deferred(stages::break_into_chapters(brain, &brief)),
            )
            .await?;

        let mut all_text = String::new();
        let mut facts: Vec<String> = Vec::new();
        let mut prose = ProseByChapter::new();

        for chapter in &plan.chapters {
            let sections = recorder
                .record(
                    &format!(
                        "Break chapter {} into {} sections",
                        chapter.number, config.sections_per_chapter
                    ),
                    Some(&plan),
                    StageWork::deferred(stages::break_into_sections(
                        brain,
                        chapter,
                        config.sections_per_chapter,
                    )),
                )
                .await?;

            for section in &sections.sections {
                let ctx = ProseContext {
                    chapter,
                    section,
                    previous_text: tail_chars(&all_text, self.prose_window),
                    facts: &facts,
                    style: &style,
                };
                let result = recorder
                    .record(
                        &format!("Write chapter {}, section {}", chapter.number, section.number),
                        Some(&sections),
                        StageWork::deferred(stages::write_section(brain, &ctx)),
                    )
                    .await?;

                if !all_text.is_empty() {
                    all_text.push_str("\n\n");
                }
                all_text.push_str(&result.text);
                facts.extend(result.new_facts);
                prose
                    .entry(chapter.number)
                    .or_default()
                    .insert(section.number, result.text);
            }
        }

        let request = PackageRequest {
            title: &title.title,
            author: &config.author,
            chapters: &plan.chapters,
            text_by_section_by_chapter: &prose,
            output_dir: &dir,
            themes: themes.labels(),
            plot_type: plot.plot_type.label(),
        };
        let package = recorder
            .record(
                "Package manuscript",
                Some(&plan),
                StageWork::deferred(self.packager.assemble(request)),
            )
            .await?;

        self.store
            .mark_finished(&dir, &package.document_path, package.cover_path.as_deref())
            .await?;

        Ok(NovelOutcome {
            title: title.title,
            dir,
            document_path: package.document_path,
            cover_path: package.cover_path,
            sections_written: prose.values().map(|s| s.len()).sum(),
            facts: facts.len(),
        })
    }
}
