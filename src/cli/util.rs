//! CLI Common Utilities
//!
//! Shared setup for command handlers: configuration, the run store, and
//! pipeline construction.

use std::path::PathBuf;

use crate::ai::{Brain, CacheConfig, FingerprintCache, ProviderConfig, create_provider};
use crate::cli::progress::{ConsoleRenderer, ProgressTracker};
use crate::config::{Config, ConfigLoader};
use crate::novel::NovelPipeline;
use crate::storage::RunStore;
use crate::types::Result;

/// Command execution context
pub struct CommandContext {
    pub config: Config,
    pub store: RunStore,
}

impl CommandContext {
    /// Load configuration, optionally moving the output root.
    pub fn load(output: Option<PathBuf>) -> Result<Self> {
        let mut config = ConfigLoader::load()?;
        if let Some(output) = output {
            config.output.root_dir = output;
        }
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: Config) -> Self {
        let store = RunStore::new(config.output.root_dir.clone());
        Self { config, store }
    }

    pub fn cache(&self) -> FingerprintCache {
        FingerprintCache::new(CacheConfig::new(self.config.output.resolved_cache_dir()))
    }

    /// Pipeline backed by the engine named `model` (`provider:model`).
    pub fn pipeline(
        &self,
        model: &str,
        progress: Option<ProgressTracker>,
    ) -> Result<NovelPipeline> {
        let mut llm = self.config.llm.clone();
        llm.model = model.to_string();
        let provider = create_provider(&ProviderConfig::from_llm_config(&llm))?;

        let pipeline = NovelPipeline::new(Brain::new(provider, self.cache()), self.store.clone())
            .with_prose_window(self.config.writing.prose_window_chars);
        Ok(match progress {
            Some(progress) => pipeline.with_progress(progress),
            None => pipeline,
        })
    }
}

/// Progress tracker with a console renderer attached, unless `quiet`
pub fn console_progress(quiet: bool) -> Option<(ProgressTracker, tokio::task::JoinHandle<()>)> {
    if quiet {
        return None;
    }
    let tracker = ProgressTracker::new();
    let handle = ConsoleRenderer::new(tracker.clone()).start_render_loop();
    Some((tracker, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{RunConfig, title_slug};
    use serde_json::json;
    use tempfile::TempDir;

    fn context(root: &std::path::Path) -> CommandContext {
        let mut config = Config::default();
        config.output.root_dir = root.to_path_buf();
        CommandContext::from_config(config)
    }

    #[test]
    fn test_cache_lives_under_the_chosen_root() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = context(temp_dir.path());
        assert_eq!(ctx.cache().cache_dir(), temp_dir.path().join(".cache"));
        assert_eq!(ctx.store.root(), temp_dir.path());
    }

    #[tokio::test]
    async fn test_run_titled_cache_survives_cache_clear() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = context(temp_dir.path());
        let config = RunConfig {
            description: "A cache of letters".to_string(),
            author: "Anonymous".to_string(),
            model_name: "ollama:gpt-oss:20b".to_string(),
            num_chapters: 1,
            sections_per_chapter: 1,
        };

        let (_, dir) = ctx.store.create("cache", &config).await.unwrap();
        assert_eq!(dir, temp_dir.path().join(title_slug("cache").unwrap()));
        assert_ne!(dir, ctx.cache().cache_dir());

        let cache = ctx.cache();
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entry_count, 0);

        let _: String = cache
            .get_or_compute("chat", &json!({"prompt": "hi"}), || async {
                Ok("hello".to_string())
            })
            .await
            .unwrap();
        assert_eq!(cache.clear().await.unwrap(), 1);
        assert!(ctx.store.read(&dir).await.unwrap().is_some());
    }
}
