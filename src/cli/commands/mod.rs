pub mod cache;
pub mod config;
pub mod list;
pub mod resume;
pub mod write;
