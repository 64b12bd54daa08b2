//! Resume Command
//!
//! Continue an interrupted or failed run. Without `--title` or `--dir` the
//! most recently updated unfinished run is picked.

use std::path::PathBuf;

use tokio::runtime::Runtime;

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, console_progress};
use crate::types::{NovelError, Result};

pub fn run(
    title: Option<String>,
    dir: Option<PathBuf>,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    let ctx = CommandContext::load(output)?;
    let out = Output::new();
    let rt = Runtime::new()?;

    rt.block_on(async {
        let dir = match (dir, title) {
            (Some(dir), _) => dir,
            (None, Some(title)) => ctx
                .store
                .find_by_title(&title)
                .await?
                .ok_or(NovelError::TitleNotFound(title))?,
            (None, None) => match ctx.store.latest_unfinished().await? {
                Some(run) => run.directory,
                None => {
                    out.info("No unfinished runs to resume");
                    return Ok(());
                }
            },
        };

        // The engine recorded with the run, not the configured default
        let record = ctx.store.require(&dir).await?;
        out.info(&format!(
            "Resuming '{}' with {}",
            record.title, record.model_name
        ));

        let (tracker, renderer) = console_progress(quiet).unzip();
        let pipeline = ctx.pipeline(&record.model_name, tracker)?;
        let result = pipeline.resume(&dir).await;
        drop(pipeline);
        if let Some(renderer) = renderer {
            let _ = renderer.await;
        }

        let outcome = result?;
        out.success(&format!("Finished '{}'", outcome.title));
        out.field("document", outcome.document_path.display());
        Ok::<_, NovelError>(())
    })
}
