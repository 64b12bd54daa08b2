//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Novel shape defaults
pub mod novel {
    /// Default number of chapters
    pub const DEFAULT_CHAPTERS: u32 = 10;

    /// Default number of sections per chapter
    pub const DEFAULT_SECTIONS_PER_CHAPTER: u32 = 10;

    /// Author recorded when none is given
    pub const DEFAULT_AUTHOR: &str = "Anonymous";

    /// Default generation engine identity (`provider:model`)
    pub const DEFAULT_MODEL: &str = "ollama:gpt-oss:20b";
}

/// Prompt-building limits
pub mod writing {
    /// Characters of the most recent prose passed to the next section
    pub const DEFAULT_PROSE_WINDOW_CHARS: usize = 2000;

    /// Characters of the outline passed to the style stage
    pub const STYLE_OUTLINE_CHARS: usize = 1000;

    /// Characters of a summary shown in progress output
    pub const SUMMARY_PREVIEW_CHARS: usize = 80;
}

/// On-disk layout
pub mod storage {
    /// Run record file name inside a run's working directory
    pub const RUN_RECORD_FILE: &str = "metadata.json";

    /// Default root for run working directories
    pub const DEFAULT_OUTPUT_DIR: &str = "output";

    /// Cache directory name under the output root. The leading dot keeps it
    /// out of the title slug namespace.
    pub const CACHE_DIR_NAME: &str = ".cache";

    /// Step record / cache entry extension
    pub const RECORD_EXTENSION: &str = "json";
}

/// HTTP/Network constants
pub mod network {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;
}
