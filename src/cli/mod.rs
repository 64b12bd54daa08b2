pub mod commands;
pub mod progress;
pub mod ui;
pub mod util;

pub use progress::{ConsoleRenderer, ProgressEvent, ProgressTracker};
pub use util::{CommandContext, console_progress};
