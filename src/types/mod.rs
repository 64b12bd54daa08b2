pub mod error;
pub mod utils;

pub use error::{ErrorCategory, ErrorClassifier, LlmError, NovelError, Result};
pub use utils::{enum_to_str, head_chars, preview, tail_chars};
