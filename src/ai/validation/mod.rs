//! Response Validation
//!
//! JSON extraction and repair for structured engine responses. Schema
//! conformance is enforced afterwards by deserializing into the stage's type.

mod json_repair;

pub use json_repair::{JsonRepairer, extract_json_from_response};
