pub mod files;
pub mod run_store;

pub use files::{read_if_exists, write_json_atomic};
pub use run_store::{RunConfig, RunRecord, RunStatus, RunStore, RunSummary, title_slug};
