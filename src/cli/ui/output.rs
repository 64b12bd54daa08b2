use console::style;

use crate::storage::{RunStatus, RunSummary};

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        println!("  {:<10} {}", style(label).dim(), value);
    }

    /// One listing row per run
    pub fn run(&self, run: &RunSummary) {
        let status = match run.status {
            RunStatus::Ongoing => style(run.status.to_string()).yellow(),
            RunStatus::Finished => style(run.status.to_string()).green(),
            RunStatus::Failed => style(run.status.to_string()).red(),
        };
        println!("{} [{}]", style(&run.title).bold(), status);
        self.field("updated", run.updated_at.format("%Y-%m-%d %H:%M"));
        self.field("steps", run.completed_steps);
        if let Some(step) = &run.current_step {
            self.field("at", step);
        }
        if let Some(reason) = &run.failure_reason {
            self.field("error", reason);
        }
        if let Some(path) = &run.document_path {
            self.field("document", path.display());
        }
        self.field("directory", run.directory.display());
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
