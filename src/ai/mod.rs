//! Generation Engine Layer
//!
//! Provider abstraction, structured-response repair, and the fingerprint
//! cache that makes every engine call replayable.

pub mod brain;
pub mod cache;
pub mod provider;
pub mod validation;

pub use brain::{Brain, StructuredOutput};
pub use cache::{CacheConfig, CacheEntry, CacheStats, FingerprintCache};
pub use provider::{
    ChatMessage, ClaudeCodeProvider, LlmProvider, LlmResponse, OllamaProvider, OpenAiProvider,
    ProviderConfig, Role, SharedProvider, TokenUsage, create_provider,
};
pub use validation::JsonRepairer;
