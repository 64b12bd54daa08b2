//! Cache Command
//!
//! Inspect or clear the fingerprint cache under the output root.

use std::path::PathBuf;

use tokio::runtime::Runtime;

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::Result;

pub fn stats(output: Option<PathBuf>) -> Result<()> {
    let ctx = CommandContext::load(output)?;
    let cache = ctx.cache();
    let stats = Runtime::new()?.block_on(cache.stats())?;

    let out = Output::new();
    out.header("Fingerprint cache");
    out.field("directory", cache.cache_dir().display());
    out.field("entries", stats.entry_count);
    out.field("size", format_bytes(stats.total_size_bytes));
    Ok(())
}

pub fn clear(output: Option<PathBuf>) -> Result<()> {
    let ctx = CommandContext::load(output)?;
    let removed = Runtime::new()?.block_on(ctx.cache().clear())?;
    Output::new().success(&format!("Removed {} cache entries", removed));
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
