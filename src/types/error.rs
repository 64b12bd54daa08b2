//! Unified Error Type System
//!
//! Centralized error types for the whole crate.
//!
//! ## Error Categories
//!
//! Engine failures carry an [`ErrorCategory`] so the operator sees *why* a call
//! failed (rate limit, auth, network...). The category is informational only:
//! the pipeline never retries on its own. Recovery is stage-granular through
//! resume.
//!
//! ## Design Principles
//!
//! - Single error type (`NovelError`) for the library
//! - Structured variants for the pipeline's own failure modes
//! - No panic/unwrap outside tests

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Classification of generation-engine failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited or quota exhausted
    RateLimit,
    /// Context/token limit exceeded
    TokenLimit,
    /// Authentication failed
    Auth,
    /// Network/connectivity issues
    Network,
    /// Provider or model unavailable
    Unavailable,
    /// Invalid request
    BadRequest,
    /// Response could not be parsed or did not match the schema
    ParseError,
    /// Temporary server-side issue
    Transient,
    /// Anything else
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::TokenLimit => write!(f, "TOKEN_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Short operator hint shown next to a failed run
    pub fn hint(&self) -> &'static str {
        match self {
            Self::RateLimit => "wait for the quota window, then resume the run",
            Self::TokenLimit => {
                "the prompt is too large for this model; try a larger context model"
            }
            Self::Auth => "check the API key",
            Self::Network => "check connectivity to the provider, then resume the run",
            Self::Unavailable => "check that the provider is running and the model is installed",
            Self::BadRequest => "check the model name and provider settings",
            Self::ParseError => "the model returned malformed output; resuming retries the step",
            Self::Transient => "resume the run to retry the step",
            Self::Unknown => "resume the run to retry the step",
        }
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// Generation-engine error with category and provider context
#[derive(Debug, Clone)]
pub struct LlmError {
    pub category: ErrorCategory,
    pub message: String,
    pub provider: Option<String>,
    /// Retry-after hint reported by the provider, surfaced to the operator
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
            retry_after: None,
        }
    }

    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: Some(provider.into()),
            retry_after: None,
        }
    }

    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps raw provider failures onto an [`ErrorCategory`]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an error message from any provider
    pub fn classify(message: &str, provider: &str) -> LlmError {
        let lower = message.to_lowercase();

        if lower.contains("rate limit")
            || lower.contains("429")
            || lower.contains("too many requests")
            || lower.contains("quota exceeded")
        {
            return LlmError::with_provider(ErrorCategory::RateLimit, message, provider)
                .retry_after(Duration::from_secs(30));
        }

        if lower.contains("token")
            && (lower.contains("limit") || lower.contains("exceed") || lower.contains("maximum"))
            || lower.contains("context length")
            || lower.contains("context too long")
        {
            return LlmError::with_provider(ErrorCategory::TokenLimit, message, provider);
        }

        if lower.contains("401")
            || lower.contains("403")
            || lower.contains("api key")
            || lower.contains("unauthorized")
        {
            return LlmError::with_provider(ErrorCategory::Auth, message, provider);
        }

        if lower.contains("connection")
            || lower.contains("dns")
            || lower.contains("timed out")
            || lower.contains("timeout")
            || lower.contains("unreachable")
        {
            return LlmError::with_provider(ErrorCategory::Network, message, provider);
        }

        if lower.contains("503")
            || lower.contains("service unavailable")
            || lower.contains("not found")
            || lower.contains("not installed")
        {
            return LlmError::with_provider(ErrorCategory::Unavailable, message, provider);
        }

        if lower.contains("parse") || lower.contains("json") || lower.contains("schema") {
            return LlmError::with_provider(ErrorCategory::ParseError, message, provider);
        }

        LlmError::with_provider(ErrorCategory::Unknown, message, provider)
    }

    /// Classify an HTTP status code directly (more accurate than string matching)
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> LlmError {
        match status {
            429 => LlmError::with_provider(ErrorCategory::RateLimit, message, provider)
                .retry_after(Duration::from_secs(30)),
            401 | 403 => LlmError::with_provider(ErrorCategory::Auth, message, provider),
            400 | 422 => LlmError::with_provider(ErrorCategory::BadRequest, message, provider),
            404 => LlmError::with_provider(ErrorCategory::Unavailable, message, provider),
            500 | 502 | 503 | 504 => {
                LlmError::with_provider(ErrorCategory::Transient, message, provider)
            }
            _ => LlmError::with_provider(ErrorCategory::Unknown, message, provider),
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum NovelError {
    // -------------------------------------------------------------------------
    // System Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Generation Engine
    // -------------------------------------------------------------------------
    #[error("LLM error: {0}")]
    Llm(LlmError),

    // -------------------------------------------------------------------------
    // Pipeline
    // -------------------------------------------------------------------------
    /// The engine returned a different number of items than requested
    #[error("Expected exactly {requested} {what}, the model returned {returned}")]
    CountMismatch {
        what: &'static str,
        requested: usize,
        returned: usize,
    },

    /// A cache entry exists but cannot be read back
    #[error("Corrupt cache entry {}: {reason}", path.display())]
    CacheCorrupt { path: PathBuf, reason: String },

    /// A persisted run or step record exists but cannot be read back
    #[error("Corrupt record {}: {reason}", path.display())]
    RecordCorrupt { path: PathBuf, reason: String },

    /// Two different stage descriptions map to the same record file
    #[error("Step '{description}' collides with '{existing}' (both map to '{slug}.json')")]
    SlugCollision {
        slug: String,
        description: String,
        existing: String,
    },

    // -------------------------------------------------------------------------
    // Run State
    // -------------------------------------------------------------------------
    #[error("No run record in {}", .0.display())]
    RunNotFound(PathBuf),

    #[error("A run already exists in {}; resume it or start over with --overwrite", .0.display())]
    RunExists(PathBuf),

    #[error("Title '{0}' does not produce a usable directory name")]
    InvalidTitle(String),

    #[error("No run titled '{0}'")]
    TitleNotFound(String),
}

impl From<LlmError> for NovelError {
    fn from(err: LlmError) -> Self {
        NovelError::Llm(err)
    }
}

pub type Result<T> = std::result::Result<T, NovelError>;

impl NovelError {
    /// Build a categorized engine error from a provider message
    pub fn llm(provider: &str, message: impl Into<String>) -> Self {
        Self::Llm(ErrorClassifier::classify(&message.into(), provider))
    }

    /// Build an engine error with an explicit category
    pub fn llm_with_category(
        category: ErrorCategory,
        provider: &str,
        message: impl Into<String>,
    ) -> Self {
        Self::Llm(LlmError::with_provider(category, message, provider))
    }

    /// Operator hint for errors that have one
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Llm(e) => Some(e.category.hint()),
            Self::CountMismatch { .. } => {
                Some("the model ignored the requested count; resuming retries the step")
            }
            Self::CacheCorrupt { .. } => Some("delete the named cache file or run `cache clear`"),
            Self::RunExists(_) => Some("use `resume` or pass --overwrite"),
            _ => None,
        }
    }

    /// Wait the provider asked for before the next attempt
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Llm(e) => e.retry_after,
            _ => None,
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
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCategory::TokenLimit.to_string(), "TOKEN_LIMIT");
        assert_eq!(ErrorCategory::Auth.to_string(), "AUTH");
    }

    #[test]
    fn test_classify_rate_limit() {
        let err = ErrorClassifier::classify("Rate limit exceeded, please retry", "openai");
        assert_eq!(err.category, ErrorCategory::RateLimit);
        assert_eq!(err.retry_after, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_classify_network() {
        let err = ErrorClassifier::classify("Connection refused by 127.0.0.1:11434", "ollama");
        assert_eq!(err.category, ErrorCategory::Network);
    }

    #[test]
    fn test_classify_unknown() {
        let err = ErrorClassifier::classify("Something weird happened", "test");
        assert_eq!(err.category, ErrorCategory::Unknown);
    }

    #[test]
    fn test_classify_http_status() {
        let rate_limit = ErrorClassifier::classify_http_status(429, "Rate limited", "test");
        assert_eq!(rate_limit.category, ErrorCategory::RateLimit);

        let auth = ErrorClassifier::classify_http_status(401, "Unauthorized", "test");
        assert_eq!(auth.category, ErrorCategory::Auth);

        let missing = ErrorClassifier::classify_http_status(404, "model not found", "test");
        assert_eq!(missing.category, ErrorCategory::Unavailable);
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::with_provider(ErrorCategory::RateLimit, "Too many requests", "openai");
        assert_eq!(err.to_string(), "[openai:RATE_LIMIT] Too many requests");

        let err_no_provider = LlmError::new(ErrorCategory::Network, "Connection failed");
        assert_eq!(err_no_provider.to_string(), "[NETWORK] Connection failed");
    }

    #[test]
    fn test_count_mismatch_message() {
        let err = NovelError::CountMismatch {
            what: "chapters",
            requested: 3,
            returned: 2,
        };
        assert_eq!(
            err.to_string(),
            "Expected exactly 3 chapters, the model returned 2"
        );
        assert!(err.hint().is_some());
        assert!(err.retry_after().is_none());
    }

    #[test]
    fn test_rate_limit_exposes_retry_after() {
        let limited = ErrorClassifier::classify_http_status(429, "slow down", "openai");
        let err = NovelError::Llm(limited);
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
        assert_eq!(
            err.hint(),
            Some("wait for the quota window, then resume the run")
        );
    }
}
