//! Stage Recorder
//!
//! Wraps every pipeline stage so a run can be interrupted and resumed:
//!
//! 1. The stage description maps to a record file via [`step_slug`]; the
//!    registry rejects two descriptions that land on the same file.
//! 2. In resume mode an existing record is loaded and returned as-is.
//! 3. Otherwise the step is marked in flight, the work runs, the result is
//!    written atomically and the step is marked completed.
//!
//! A failing stage writes nothing and leaves the step in flight, so the next
//! resume re-executes exactly that stage.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Instant;

use futures::future::BoxFuture;
use regex::Regex;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, info};

use crate::cli::progress::ProgressTracker;
use crate::constants::storage::RECORD_EXTENSION;
use crate::storage::{RunStore, read_if_exists, write_json_atomic};
use crate::types::{NovelError, Result};

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static pattern"));

static LEADING_VERB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(generate|determine|create|select)_").expect("static pattern")
});

/// Record file stem for a stage description.
///
/// `"Write chapter 1, section 2"` becomes `write_chapter_1_section_2`;
/// `"Create outline"` becomes `outline`.
pub fn step_slug(description: &str) -> String {
    let lowered = description.to_lowercase();
    let underscored = NON_ALNUM.replace_all(&lowered, "_");
    let trimmed = underscored.trim_matches('_');
    LEADING_VERB.replace(trimmed, "").into_owned()
}

/// One-line description of a stage result, for progress output
pub trait Summary: Send + Sync {
    fn summary(&self) -> String;
}

/// Anything a stage may produce and persist
pub trait StepOutput: Serialize + DeserializeOwned + Summary + Send {}

impl<T> StepOutput for T where T: Serialize + DeserializeOwned + Summary + Send {}

/// Where and how a run is being recorded
#[derive(Debug, Clone)]
pub struct RunContext {
    pub dir: PathBuf,
    /// Trust existing step records instead of recomputing them
    pub resume: bool,
}

impl RunContext {
    pub fn fresh(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            resume: false,
        }
    }

    pub fn resuming(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            resume: true,
        }
    }
}

/// Stage result: already computed, or computed only if the step must run
pub enum StageWork<'a, T> {
    Ready(T),
    Deferred(BoxFuture<'a, Result<T>>),
}

impl<'a, T> StageWork<'a, T> {
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'a,
    {
        Self::Deferred(Box::pin(future))
    }

    async fn resolve(self) -> Result<T> {
        match self {
            Self::Ready(value) => Ok(value),
            Self::Deferred(future) => future.await,
        }
    }
}

/// Slug to description map for one run
#[derive(Debug, Default)]
pub struct StepRegistry {
    slugs: HashMap<String, String>,
}

impl StepRegistry {
    /// Register `description` and return its slug.
    pub fn register(&mut self, description: &str) -> Result<String> {
        let slug = step_slug(description);
        if slug.is_empty() {
            return Err(NovelError::Config(format!(
                "Step description '{}' has no usable record name",
                description
            )));
        }

        match self.slugs.get(&slug) {
            Some(existing) if existing != description => Err(NovelError::SlugCollision {
                slug,
                description: description.to_string(),
                existing: existing.clone(),
            }),
            Some(_) => Ok(slug),
            None => {
                self.slugs.insert(slug.clone(), description.to_string());
                Ok(slug)
            }
        }
    }
}

// =============================================================================
// StageRecorder
// =============================================================================

pub struct StageRecorder {
    store: RunStore,
    context: RunContext,
    registry: StepRegistry,
    progress: Option<ProgressTracker>,
}

impl StageRecorder {
    pub fn new(store: RunStore, context: RunContext) -> Self {
        Self {
            store,
            context,
            registry: StepRegistry::default(),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressTracker>) -> Self {
        self.progress = progress;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.context.dir
    }

    pub fn store(&self) -> &RunStore {
        &self.store
    }

    pub fn progress(&self) -> Option<&ProgressTracker> {
        self.progress.as_ref()
    }

    /// Run one stage, or return its persisted result when resuming.
    ///
    /// `previous` is the result this stage builds on; only its summary is
    /// used, for progress output.
    pub async fn record<T: StepOutput>(
        &mut self,
        description: &str,
        previous: Option<&dyn Summary>,
        work: StageWork<'_, T>,
    ) -> Result<T> {
        let slug = self.registry.register(description)?;
        let path = self
            .context
            .dir
            .join(format!("{}.{}", slug, RECORD_EXTENSION));

        if self.context.resume
            && let Some(content) = read_if_exists(&path).await?
        {
            let value: T =
                serde_json::from_str(&content).map_err(|e| NovelError::RecordCorrupt {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            self.store
                .update_step(&self.context.dir, description, true)
                .await?;

            info!("Skipping '{}': recorded in {}", description, path.display());
            if let Some(progress) = &self.progress {
                progress.step_skipped(description, value.summary());
            }
            return Ok(value);
        }

        let context = previous.map(|p| p.summary());
        match &context {
            Some(context) => info!("Starting '{}' (after: {})", description, context),
            None => info!("Starting '{}'", description),
        }
        if let Some(progress) = &self.progress {
            progress.step_started(description, context);
        }

        self.store
            .update_step(&self.context.dir, description, false)
            .await?;
        let started = Instant::now();

        let value = work.resolve().await?;

        write_json_atomic(&path, &value).await?;
        self.store
            .update_step(&self.context.dir, description, true)
            .await?;

        let elapsed = started.elapsed();
        let summary = value.summary();
        debug!("'{}' -> {}", description, path.display());
        info!(
            "Completed '{}' in {:.1}s: {}",
            description,
            elapsed.as_secs_f32(),
            summary
        );
        if let Some(progress) = &self.progress {
            progress.step_completed(description, summary, elapsed.as_millis() as u64);
        }

        Ok(value)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn slug_is_trimmed_lowercase_alnum(description in "[ -~]{0,40}") {
            let slug = step_slug(&description);
            prop_assert!(
                slug.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            );
            prop_assert!(!slug.starts_with('_'));
            prop_assert!(!slug.ends_with('_'));
        }

        #[test]
        fn slug_ignores_case(description in "[A-Za-z0-9 ,]{1,40}") {
            prop_assert_eq!(
                step_slug(&description.to_uppercase()),
                step_slug(&description.to_lowercase())
            );
        }
    }
}
