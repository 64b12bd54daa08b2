//! List Command
//!
//! Show runs, most recently updated first.

use std::path::PathBuf;

use tokio::runtime::Runtime;

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::storage::RunStatus;
use crate::types::Result;

pub fn run(status: Option<RunStatus>, format: &str, output: Option<PathBuf>) -> Result<()> {
    let ctx = CommandContext::load(output)?;
    let runs = Runtime::new()?.block_on(ctx.store.list_by_status(status))?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    let out = Output::new();
    if runs.is_empty() {
        out.info(&format!("No runs under {}", ctx.store.root().display()));
        return Ok(());
    }
    for run in &runs {
        out.run(run);
        println!();
    }
    Ok(())
}
