//! Noveliser - Resumable Novel Generation
//!
//! Turns a one-line story description into a complete manuscript through a
//! fixed sequence of generation stages, each persisted so an interrupted run
//! picks up where it stopped.
//!
//! ## Core Features
//!
//! - **Stage Recorder**: one JSON record per stage, resume skips recorded stages
//! - **Fingerprint Cache**: every engine call memoized on disk across runs
//! - **Run Store**: per-run status, configuration and progress in `metadata.json`
//! - **Providers**: Ollama, OpenAI and the Claude Code CLI
//!
//! ## Quick Start
//!
//! ```ignore
//! use noveliser::ai::{Brain, CacheConfig, FingerprintCache, ProviderConfig, create_provider};
//! use noveliser::novel::{NovelPipeline, NovelRequest};
//! use noveliser::storage::RunStore;
//!
//! let provider = create_provider(&ProviderConfig::default())?;
//! let brain = Brain::new(provider, FingerprintCache::new(CacheConfig::new("output/.cache")));
//! let pipeline = NovelPipeline::new(brain, RunStore::new("output"));
//! let outcome = pipeline.write(request).await?;
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: providers, response repair, fingerprint cache
//! - [`novel`]: stages, recorder, packaging, pipeline driver
//! - [`storage`]: atomic JSON files and the run store
//! - [`config`]: layered configuration

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod novel;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};
pub use types::error::{ErrorCategory, NovelError, Result};

pub use ai::{Brain, FingerprintCache, LlmProvider, SharedProvider, create_provider};
pub use novel::{NovelOutcome, NovelPipeline, NovelRequest};
pub use storage::{RunRecord, RunStatus, RunStore};
