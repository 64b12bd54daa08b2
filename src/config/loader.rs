//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (platform config dir, e.g. ~/.config/noveliser/config.toml)
//! 3. Project config (.noveliser/config.toml)
//! 4. Environment variables (NOVELISER_* prefix, `__` between sections)

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{NovelError, Result};

const CONFIG_FILE: &str = "config.toml";
const PROJECT_DIR: &str = ".noveliser";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        // NOVELISER_LLM__MODEL -> llm.model, NOVELISER_NOVEL__NUM_CHAPTERS -> novel.num_chapters
        figment = figment.merge(Env::prefixed("NOVELISER_").split("__").lowercase(true));

        Self::extract(figment)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        Self::extract(
            Figment::new()
                .merge(Serialized::defaults(Config::default()))
                .merge(Toml::file(path)),
        )
    }

    fn extract(figment: Figment) -> Result<Config> {
        let config: Config = figment
            .extract()
            .map_err(|e| NovelError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Platform config directory (e.g. ~/.config/noveliser/)
    pub fn global_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "noveliser").map(|dirs| dirs.config_dir().to_path_buf())
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    pub fn project_config_path() -> PathBuf {
        PathBuf::from(PROJECT_DIR).join(CONFIG_FILE)
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Show current effective configuration
    pub fn show_config(as_json: bool) -> Result<()> {
        let config = Self::load()?;
        println!("{}", Self::render(&config, as_json)?);
        Ok(())
    }

    fn render(config: &Config, as_json: bool) -> Result<String> {
        if as_json {
            Ok(serde_json::to_string_pretty(config)?)
        } else {
            toml::to_string_pretty(config).map_err(|e| NovelError::Config(e.to_string()))
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write a default global config. Existing files are kept unless `force`.
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            NovelError::Config("Cannot determine global config directory".to_string())
        })?;
        Self::write_default(&global_dir, force)
    }

    /// Write a default project config under `.noveliser/`.
    pub fn init_project(force: bool) -> Result<PathBuf> {
        Self::write_default(Path::new(PROJECT_DIR), force)
    }

    fn write_default(dir: &Path, force: bool) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;

        let config_path = dir.join(CONFIG_FILE);
        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_config_toml()?)?;
            info!("Created config: {}", config_path.display());
        } else {
            info!("Config exists: {}", config_path.display());
        }

        Ok(config_path)
    }

    fn default_config_toml() -> Result<String> {
        let body = Self::render(&Config::default(), false)?;
        Ok(format!(
            "# Noveliser Configuration\n\
             # Project settings in .noveliser/config.toml override the global file.\n\
             # Environment variables use NOVELISER_<SECTION>__<KEY>.\n\n{}",
            body
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            "[novel]\nnum_chapters = 3\n\n[llm]\nmodel = \"openai:gpt-4o-mini\"\n",
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.novel.num_chapters, 3);
        assert_eq!(config.novel.sections_per_chapter, 10);
        assert_eq!(config.llm.model, "openai:gpt-4o-mini");
    }

    #[test]
    fn test_load_from_file_validates() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[novel]\nsections_per_chapter = 0\n").unwrap();

        assert!(matches!(
            ConfigLoader::load_from_file(&path),
            Err(NovelError::Config(_))
        ));
    }

    #[test]
    fn test_default_config_round_trips_through_loader() {
        let temp_dir = TempDir::new().unwrap();
        let path = ConfigLoader::write_default(temp_dir.path(), false).unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.writing.prose_window_chars, 2000);
    }

    #[test]
    fn test_write_default_keeps_existing_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&path, "version = \"custom\"\n").unwrap();

        ConfigLoader::write_default(temp_dir.path(), false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "version = \"custom\"\n");

        ConfigLoader::write_default(temp_dir.path(), true).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("[novel]"));
    }
}
