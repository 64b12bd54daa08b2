//! Run State Store
//!
//! One working directory per run under the output root, named by the title
//! slug. The directory holds `metadata.json` (the [`RunRecord`]) next to the
//! step records written by the stage recorder.
//!
//! Every mutation is a full read-modify-write that refreshes `updated_at`
//! and atomically replaces the record.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::files::{read_if_exists, write_json_atomic};
use crate::constants::storage::RUN_RECORD_FILE;
use crate::types::{NovelError, Result};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Ongoing,
    Finished,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ongoing => write!(f, "ongoing"),
            Self::Finished => write!(f, "finished"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ongoing" => Ok(Self::Ongoing),
            "finished" => Ok(Self::Finished),
            "failed" => Ok(Self::Failed),
            _ => Err(format!(
                "Unknown run status: {}. Valid values: ongoing, finished, failed",
                s
            )),
        }
    }
}

/// Requested shape of a run, fixed at creation and restored on resume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub description: String,
    pub author: String,
    pub model_name: String,
    pub num_chapters: u32,
    pub sections_per_chapter: u32,
}

impl RunConfig {
    /// Reject shapes no run can be written with
    pub fn validate(&self) -> Result<()> {
        if self.num_chapters == 0 {
            return Err(NovelError::Config("a run needs at least 1 chapter".to_string()));
        }
        if self.sections_per_chapter == 0 {
            return Err(NovelError::Config(
                "a run needs at least 1 section per chapter".to_string(),
            ));
        }
        Ok(())
    }
}

/// Persisted record of one run (`metadata.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub title: String,
    pub description: String,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author: String,
    pub model_name: String,
    pub num_chapters: u32,
    pub sections_per_chapter: u32,
    /// Step descriptions in completion order, no duplicates
    #[serde(default)]
    pub completed_steps: Vec<String>,
    /// Step currently executing (or interrupted mid-flight)
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default)]
    pub document_path: Option<PathBuf>,
    #[serde(default)]
    pub cover_path: Option<PathBuf>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl RunRecord {
    fn new(title: &str, config: &RunConfig) -> Self {
        let now = Utc::now();
        Self {
            title: title.to_string(),
            description: config.description.clone(),
            status: RunStatus::Ongoing,
            created_at: now,
            updated_at: now,
            author: config.author.clone(),
            model_name: config.model_name.clone(),
            num_chapters: config.num_chapters,
            sections_per_chapter: config.sections_per_chapter,
            completed_steps: Vec::new(),
            current_step: None,
            document_path: None,
            cover_path: None,
            failure_reason: None,
        }
    }

    pub fn config(&self) -> RunConfig {
        RunConfig {
            description: self.description.clone(),
            author: self.author.clone(),
            model_name: self.model_name.clone(),
            num_chapters: self.num_chapters,
            sections_per_chapter: self.sections_per_chapter,
        }
    }

    pub fn is_step_completed(&self, step: &str) -> bool {
        self.completed_steps.iter().any(|s| s == step)
    }
}

/// Listing row for the run selection surface
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub title: String,
    pub description: String,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author: String,
    pub directory: PathBuf,
    pub current_step: Option<String>,
    pub completed_steps: usize,
    pub document_path: Option<PathBuf>,
    pub cover_path: Option<PathBuf>,
    pub failure_reason: Option<String>,
}

impl RunSummary {
    fn from_record(record: RunRecord, directory: PathBuf) -> Self {
        Self {
            completed_steps: record.completed_steps.len(),
            title: record.title,
            description: record.description,
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
            author: record.author,
            directory,
            current_step: record.current_step,
            document_path: record.document_path,
            cover_path: record.cover_path,
            failure_reason: record.failure_reason,
        }
    }
}

/// Filesystem-safe directory name for a title.
///
/// Keeps alphanumerics, space, `-` and `_`, trims, then turns spaces into `_`.
pub fn title_slug(title: &str) -> Result<String> {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let slug = kept.trim().replace(' ', "_");

    if slug.is_empty() {
        return Err(NovelError::InvalidTitle(title.to_string()));
    }
    Ok(slug)
}

// =============================================================================
// RunStore
// =============================================================================

#[derive(Debug, Clone)]
pub struct RunStore {
    root: PathBuf,
}

impl RunStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Working directory a title maps to
    pub fn run_dir(&self, title: &str) -> Result<PathBuf> {
        Ok(self.root.join(title_slug(title)?))
    }

    fn record_path(dir: &Path) -> PathBuf {
        dir.join(RUN_RECORD_FILE)
    }

    /// Start a run for `title`. Fails with `RunExists` if the slug directory
    /// already holds a record.
    pub async fn create(&self, title: &str, config: &RunConfig) -> Result<(RunRecord, PathBuf)> {
        let dir = self.run_dir(title)?;
        let path = Self::record_path(&dir);

        if tokio::fs::try_exists(&path).await? {
            return Err(NovelError::RunExists(dir));
        }

        let record = RunRecord::new(title, config);
        write_json_atomic(&path, &record).await?;

        info!("Created run '{}' in {}", title, dir.display());
        Ok((record, dir))
    }

    /// Remove a run's working directory entirely
    pub async fn reset(&self, dir: &Path) -> Result<()> {
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => {
                info!("Removed run directory {}", dir.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn read(&self, dir: &Path) -> Result<Option<RunRecord>> {
        let path = Self::record_path(dir);
        let Some(content) = read_if_exists(&path).await? else {
            return Ok(None);
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| NovelError::RecordCorrupt {
                path,
                reason: e.to_string(),
            })
    }

    pub async fn require(&self, dir: &Path) -> Result<RunRecord> {
        self.read(dir)
            .await?
            .ok_or_else(|| NovelError::RunNotFound(dir.to_path_buf()))
    }

    async fn mutate(&self, dir: &Path, apply: impl FnOnce(&mut RunRecord)) -> Result<RunRecord> {
        let mut record = self.require(dir).await?;
        apply(&mut record);
        record.updated_at = Utc::now();
        write_json_atomic(&Self::record_path(dir), &record).await?;
        Ok(record)
    }

    /// Mark `step` in flight, or completed when `completed` is true.
    pub async fn update_step(&self, dir: &Path, step: &str, completed: bool) -> Result<()> {
        self.mutate(dir, |record| {
            if completed {
                if !record.is_step_completed(step) {
                    record.completed_steps.push(step.to_string());
                }
                if record.current_step.as_deref() == Some(step) {
                    record.current_step = None;
                }
            } else {
                record.current_step = Some(step.to_string());
            }
        })
        .await?;

        debug!(
            "Step '{}' {}",
            step,
            if completed { "completed" } else { "started" }
        );
        Ok(())
    }

    pub async fn mark_finished(
        &self,
        dir: &Path,
        document_path: &Path,
        cover_path: Option<&Path>,
    ) -> Result<()> {
        let record = self
            .mutate(dir, |record| {
                record.status = RunStatus::Finished;
                record.document_path = Some(document_path.to_path_buf());
                record.cover_path = cover_path.map(Path::to_path_buf);
                record.current_step = None;
                record.failure_reason = None;
            })
            .await?;

        info!("Run '{}' finished: {}", record.title, document_path.display());
        Ok(())
    }

    /// Record a failure. The in-flight step is kept so the operator can see
    /// where the run stopped.
    pub async fn mark_failed(&self, dir: &Path, reason: &str) -> Result<()> {
        let record = self
            .mutate(dir, |record| {
                record.status = RunStatus::Failed;
                record.failure_reason = Some(reason.to_string());
            })
            .await?;

        warn!(
            "Run '{}' failed at {}: {}",
            record.title,
            record.current_step.as_deref().unwrap_or("(no step)"),
            reason
        );
        Ok(())
    }

    /// Put a run back into the ongoing state before resuming it
    pub async fn mark_resumed(&self, dir: &Path) -> Result<RunRecord> {
        self.mutate(dir, |record| {
            record.status = RunStatus::Ongoing;
            record.failure_reason = None;
        })
        .await
    }

    // =========================================================================
    // Selection
    // =========================================================================

    async fn all_runs(&self) -> Result<Vec<(RunRecord, PathBuf)>> {
        let mut runs = Vec::new();

        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(runs),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let dir = entry.path();
            match self.read(&dir).await {
                Ok(Some(record)) => runs.push((record, dir)),
                Ok(None) => {}
                Err(e) => warn!("Skipping {}: {}", dir.display(), e),
            }
        }
        Ok(runs)
    }

    /// Runs with `status` (all runs when `None`), most recently updated first.
    pub async fn list_by_status(&self, status: Option<RunStatus>) -> Result<Vec<RunSummary>> {
        let mut summaries: Vec<RunSummary> = self
            .all_runs()
            .await?
            .into_iter()
            .filter(|(record, _)| status.is_none_or(|s| record.status == s))
            .map(|(record, dir)| RunSummary::from_record(record, dir))
            .collect();

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    /// Directory of the run with exactly this title
    pub async fn find_by_title(&self, title: &str) -> Result<Option<PathBuf>> {
        if let Ok(dir) = self.run_dir(title)
            && let Some(record) = self.read(&dir).await?
            && record.title == title
        {
            return Ok(Some(dir));
        }

        Ok(self
            .all_runs()
            .await?
            .into_iter()
            .find(|(record, _)| record.title == title)
            .map(|(_, dir)| dir))
    }

    /// Most recently updated run that is not finished
    pub async fn latest_unfinished(&self) -> Result<Option<RunSummary>> {
        Ok(self
            .list_by_status(None)
            .await?
            .into_iter()
            .find(|run| run.status != RunStatus::Finished))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config() -> RunConfig {
        RunConfig {
            description: "A lighthouse keeper finds a map".to_string(),
            author: "Anonymous".to_string(),
            model_name: "ollama:gpt-oss:20b".to_string(),
            num_chapters: 2,
            sections_per_chapter: 3,
        }
    }

    #[test]
    fn test_title_slug() {
        assert_eq!(title_slug("The Salt Road").unwrap(), "The_Salt_Road");
        assert_eq!(title_slug("  Dusk: A Tale!  ").unwrap(), "Dusk_A_Tale");
        assert_eq!(title_slug("Half-Life_2").unwrap(), "Half-Life_2");
        assert_eq!(title_slug("Café Noir").unwrap(), "Café_Noir");
    }

    #[test]
    fn test_title_slug_rejects_empty() {
        assert!(matches!(title_slug("?!"), Err(NovelError::InvalidTitle(_))));
        assert!(title_slug("   ").is_err());
    }

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!("Failed".parse::<RunStatus>().unwrap(), RunStatus::Failed);
        assert_eq!(RunStatus::Ongoing.to_string(), "ongoing");
        assert!("paused".parse::<RunStatus>().is_err());
    }

    #[tokio::test]
    async fn test_fresh_run_is_ongoing_and_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = RunStore::new(temp_dir.path());

        let (record, dir) = store.create("The Salt Road", &config()).await.unwrap();
        assert_eq!(dir, temp_dir.path().join("The_Salt_Road"));
        assert_eq!(record.status, RunStatus::Ongoing);
        assert!(record.completed_steps.is_empty());
        assert!(record.current_step.is_none());
        assert!(record.document_path.is_none());

        let raw = std::fs::read_to_string(dir.join("metadata.json")).unwrap();
        assert!(raw.contains("\"status\": \"ongoing\""));
    }

    #[tokio::test]
    async fn test_create_twice_is_run_exists() {
        let temp_dir = TempDir::new().unwrap();
        let store = RunStore::new(temp_dir.path());

        let (_, dir) = store.create("Dusk", &config()).await.unwrap();
        assert!(matches!(
            store.create("Dusk", &config()).await,
            Err(NovelError::RunExists(_))
        ));

        store.reset(&dir).await.unwrap();
        assert!(store.create("Dusk", &config()).await.is_ok());
    }

    #[tokio::test]
    async fn test_step_lifecycle() {
        let temp_dir = TempDir::new().unwrap();
        let store = RunStore::new(temp_dir.path());
        let (_, dir) = store.create("Dusk", &config()).await.unwrap();

        store.update_step(&dir, "Generate title", false).await.unwrap();
        let record = store.require(&dir).await.unwrap();
        assert_eq!(record.current_step.as_deref(), Some("Generate title"));

        store.update_step(&dir, "Generate title", true).await.unwrap();
        store.update_step(&dir, "Generate title", true).await.unwrap();
        let record = store.require(&dir).await.unwrap();
        assert!(record.current_step.is_none());
        assert_eq!(record.completed_steps, vec!["Generate title".to_string()]);
        assert!(record.updated_at >= record.created_at);
    }

    #[tokio::test]
    async fn test_finish_sets_paths_and_clears_step() {
        let temp_dir = TempDir::new().unwrap();
        let store = RunStore::new(temp_dir.path());
        let (_, dir) = store.create("Dusk", &config()).await.unwrap();

        store.update_step(&dir, "Package manuscript", false).await.unwrap();
        let doc = dir.join("Dusk.md");
        store.mark_finished(&dir, &doc, None).await.unwrap();

        let record = store.require(&dir).await.unwrap();
        assert_eq!(record.status, RunStatus::Finished);
        assert_eq!(record.document_path.as_deref(), Some(doc.as_path()));
        assert!(record.cover_path.is_none());
        assert!(record.current_step.is_none());
    }

    #[tokio::test]
    async fn test_failed_keeps_current_step_until_resumed() {
        let temp_dir = TempDir::new().unwrap();
        let store = RunStore::new(temp_dir.path());
        let (_, dir) = store.create("Dusk", &config()).await.unwrap();

        store.update_step(&dir, "Create outline", false).await.unwrap();
        store.mark_failed(&dir, "engine down").await.unwrap();

        let record = store.require(&dir).await.unwrap();
        assert_eq!(record.status, RunStatus::Failed);
        assert_eq!(record.current_step.as_deref(), Some("Create outline"));
        assert_eq!(record.failure_reason.as_deref(), Some("engine down"));

        let record = store.mark_resumed(&dir).await.unwrap();
        assert_eq!(record.status, RunStatus::Ongoing);
        assert!(record.failure_reason.is_none());
    }

    #[tokio::test]
    async fn test_missing_run() {
        let temp_dir = TempDir::new().unwrap();
        let store = RunStore::new(temp_dir.path());
        let dir = temp_dir.path().join("nope");

        assert!(store.read(&dir).await.unwrap().is_none());
        assert!(matches!(
            store.update_step(&dir, "x", true).await,
            Err(NovelError::RunNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_by_status_orders_by_update() {
        let temp_dir = TempDir::new().unwrap();
        let store = RunStore::new(temp_dir.path());

        let (_, first) = store.create("First", &config()).await.unwrap();
        let (_, second) = store.create("Second", &config()).await.unwrap();
        store.create("Third", &config()).await.unwrap();
        store
            .mark_finished(&second, &second.join("x.md"), None)
            .await
            .unwrap();
        store.update_step(&first, "Create outline", false).await.unwrap();

        let ongoing = store.list_by_status(Some(RunStatus::Ongoing)).await.unwrap();
        let titles: Vec<_> = ongoing.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Third"]);
        assert_eq!(ongoing[0].current_step.as_deref(), Some("Create outline"));

        let finished = store.list_by_status(Some(RunStatus::Finished)).await.unwrap();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].title, "Second");

        assert_eq!(store.list_by_status(None).await.unwrap().len(), 3);
        let latest = store.latest_unfinished().await.unwrap().unwrap();
        assert_eq!(latest.title, "First");
    }

    #[tokio::test]
    async fn test_find_by_title() {
        let temp_dir = TempDir::new().unwrap();
        let store = RunStore::new(temp_dir.path());
        let (_, dir) = store.create("Dusk: A Tale", &config()).await.unwrap();

        assert_eq!(store.find_by_title("Dusk: A Tale").await.unwrap(), Some(dir));
        assert!(store.find_by_title("Dusk A Tale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_skips_corrupt_records() {
        let temp_dir = TempDir::new().unwrap();
        let store = RunStore::new(temp_dir.path());
        store.create("Good", &config()).await.unwrap();

        let bad = temp_dir.path().join("Bad");
        std::fs::create_dir_all(&bad).unwrap();
        std::fs::write(bad.join("metadata.json"), "{").unwrap();

        assert_eq!(store.list_by_status(None).await.unwrap().len(), 1);
        assert!(matches!(
            store.require(&bad).await,
            Err(NovelError::RecordCorrupt { .. })
        ));
    }
}
