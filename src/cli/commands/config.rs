//! Config Command
//!
//! Usage:
//!   noveliser config show [--format toml|json]
//!   noveliser config path
//!   noveliser config init [--global] [--force]

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the merged effective configuration
pub fn show(format: &str) -> Result<()> {
    ConfigLoader::show_config(format == "json")
}

pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

pub fn init(global: bool, force: bool) -> Result<()> {
    let path = if global {
        ConfigLoader::init_global(force)?
    } else {
        ConfigLoader::init_project(force)?
    };

    let out = Output::new();
    out.success("Initialized configuration");
    out.field("config", path.display());
    Ok(())
}
