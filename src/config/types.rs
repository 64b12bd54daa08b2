//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (platform config dir) and project (.noveliser/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{network, novel, storage, writing};
use crate::types::{NovelError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Generation engine settings
    pub llm: LlmConfig,

    /// Default novel shape
    pub novel: NovelConfig,

    /// Where runs and the cache live
    pub output: OutputConfig,

    /// Prompt-building settings
    pub writing: WritingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            novel: NovelConfig::default(),
            output: OutputConfig::default(),
            writing: WritingConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `NovelError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(NovelError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(NovelError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if !self.llm.model.contains(':') {
            return Err(NovelError::Config(format!(
                "LLM model must look like 'provider:model', got '{}'",
                self.llm.model
            )));
        }

        if self.novel.num_chapters == 0 {
            return Err(NovelError::Config(
                "novel.num_chapters must be at least 1".to_string(),
            ));
        }

        if self.novel.sections_per_chapter == 0 {
            return Err(NovelError::Config(
                "novel.sections_per_chapter must be at least 1".to_string(),
            ));
        }

        if self.writing.prose_window_chars == 0 {
            return Err(NovelError::Config(
                "writing.prose_window_chars must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Engine identity, `provider:model` (e.g. `ollama:gpt-oss:20b`)
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Sampling temperature
    pub temperature: f32,

    /// Override for the provider's base URL
    pub api_base: Option<String>,

    /// API key for hosted providers. Never written back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: novel::DEFAULT_MODEL.to_string(),
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.7,
            api_base: None,
            api_key: None,
        }
    }
}

// =============================================================================
// Novel Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NovelConfig {
    pub num_chapters: u32,
    pub sections_per_chapter: u32,
    pub author: String,
}

impl Default for NovelConfig {
    fn default() -> Self {
        Self {
            num_chapters: novel::DEFAULT_CHAPTERS,
            sections_per_chapter: novel::DEFAULT_SECTIONS_PER_CHAPTER,
            author: novel::DEFAULT_AUTHOR.to_string(),
        }
    }
}

// =============================================================================
// Output Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory holding one working directory per run
    pub root_dir: PathBuf,

    /// Fingerprint cache directory (defaults to `<root_dir>/.cache`)
    pub cache_dir: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from(storage::DEFAULT_OUTPUT_DIR),
            cache_dir: None,
        }
    }
}

impl OutputConfig {
    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| self.root_dir.join(storage::CACHE_DIR_NAME))
    }
}

// =============================================================================
// Writing Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WritingConfig {
    /// Characters of recent prose handed to the next section
    pub prose_window_chars: usize,
}

impl Default for WritingConfig {
    fn default() -> Self {
        Self {
            prose_window_chars: writing::DEFAULT_PROSE_WINDOW_CHARS,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.llm.model, "ollama:gpt-oss:20b");
        assert_eq!(config.novel.num_chapters, 10);
        assert_eq!(config.novel.sections_per_chapter, 10);
        assert_eq!(config.writing.prose_window_chars, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cache_dir_defaults_under_root() {
        let output = OutputConfig::default();
        assert_eq!(output.resolved_cache_dir(), PathBuf::from("output/.cache"));

        let custom = OutputConfig {
            root_dir: PathBuf::from("runs"),
            cache_dir: Some(PathBuf::from("/tmp/nv-cache")),
        };
        assert_eq!(custom.resolved_cache_dir(), PathBuf::from("/tmp/nv-cache"));
    }

    #[test]
    fn test_validate_rejects_zero_chapters() {
        let mut config = Config::default();
        config.novel.num_chapters = 0;
        assert!(matches!(config.validate(), Err(NovelError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bare_model_name() {
        let mut config = Config::default();
        config.llm.model = "gpt-4o".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_not_serialized() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-secret".to_string());
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(!rendered.contains("sk-secret"));
    }
}
