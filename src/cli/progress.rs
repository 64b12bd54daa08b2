//! Step Progress Streaming
//!
//! The stage recorder reports every step transition on a broadcast channel;
//! the console renderer subscribes and prints one line per event. With no
//! subscriber attached the events are simply dropped.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use console::style;
use tokio::sync::broadcast;

/// Progress event types
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Step is about to run; `context` summarizes the input it builds on
    StepStarted {
        step: String,
        context: Option<String>,
    },
    /// Step record found on resume
    StepSkipped { step: String, summary: String },
    StepCompleted {
        step: String,
        summary: String,
        duration_ms: u64,
    },
    /// Run finished, successfully or not
    Finished {
        success: bool,
        total_duration_secs: u64,
        summary: String,
    },
}

/// Step progress tracker
#[derive(Clone)]
pub struct ProgressTracker {
    sender: broadcast::Sender<ProgressEvent>,
    start_time: Arc<RwLock<Option<Instant>>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);

        Self {
            sender,
            start_time: Arc::new(RwLock::new(None)),
        }
    }

    #[inline]
    fn emit(&self, event: ProgressEvent) {
        // No receivers when no renderer is attached
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    fn elapsed_secs(&self) -> u64 {
        self.start_time
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(|s| s.elapsed().as_secs())
            .unwrap_or(0)
    }

    pub fn start(&self) {
        *self
            .start_time
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Instant::now());
    }

    pub fn step_started(&self, step: &str, context: Option<String>) {
        self.emit(ProgressEvent::StepStarted {
            step: step.to_string(),
            context,
        });
    }

    pub fn step_skipped(&self, step: &str, summary: String) {
        self.emit(ProgressEvent::StepSkipped {
            step: step.to_string(),
            summary,
        });
    }

    pub fn step_completed(&self, step: &str, summary: String, duration_ms: u64) {
        self.emit(ProgressEvent::StepCompleted {
            step: step.to_string(),
            summary,
            duration_ms,
        });
    }

    pub fn finish(&self, success: bool, summary: &str) {
        self.emit(ProgressEvent::Finished {
            success,
            total_duration_secs: self.elapsed_secs(),
            summary: summary.to_string(),
        });
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Console Rendering
// =============================================================================

/// Prints progress events as they arrive
pub struct ConsoleRenderer {
    tracker: ProgressTracker,
}

impl ConsoleRenderer {
    pub fn new(tracker: ProgressTracker) -> Self {
        Self { tracker }
    }

    /// Print events until the run finishes or every tracker is dropped
    pub fn start_render_loop(self) -> tokio::task::JoinHandle<()> {
        let mut receiver = self.tracker.subscribe();

        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        eprintln!("{}", render_event(&event));
                        if matches!(event, ProgressEvent::Finished { .. }) {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

fn render_event(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::StepStarted { step, context } => {
            let mut line = format!("{} {}", style("→").cyan(), step);
            if let Some(context) = context {
                line.push_str(&format!(" {}", style(format!("(after: {})", context)).dim()));
            }
            line
        }
        ProgressEvent::StepSkipped { step, summary } => format!(
            "{} {} {}",
            style("↷").dim(),
            style(step).dim(),
            style(format!("[recorded] {}", summary)).dim()
        ),
        ProgressEvent::StepCompleted {
            step,
            summary,
            duration_ms,
        } => format!(
            "{} {} {} {}",
            style("✓").green(),
            step,
            style(format!("({})", format_duration(duration_ms / 1000))).dim(),
            summary
        ),
        ProgressEvent::Finished {
            success,
            total_duration_secs,
            summary,
        } => {
            let mark = if *success {
                style("✓").green()
            } else {
                style("✗").red()
            };
            format!(
                "{} {} in {}",
                mark,
                summary,
                format_duration(*total_duration_secs)
            )
        }
    }
}

/// Format duration as human-readable string
fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_reach_subscribers_in_order() {
        let tracker = ProgressTracker::new();
        let mut receiver = tracker.subscribe();

        tracker.start();
        tracker.step_skipped("Generate title", "The Keeper".to_string());
        tracker.step_started("Create outline", None);
        tracker.step_completed("Create outline", "Act one".to_string(), 10);
        tracker.finish(true, "'The Keeper' finished");

        assert!(matches!(
            receiver.recv().await.unwrap(),
            ProgressEvent::StepSkipped { step, .. } if step == "Generate title"
        ));
        match receiver.recv().await.unwrap() {
            ProgressEvent::StepStarted { step, context } => {
                assert_eq!(step, "Create outline");
                assert!(context.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(
            receiver.recv().await.unwrap(),
            ProgressEvent::StepCompleted { duration_ms: 10, .. }
        ));
        assert!(matches!(
            receiver.recv().await.unwrap(),
            ProgressEvent::Finished { success: true, .. }
        ));
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let tracker = ProgressTracker::default();
        tracker.step_started("Create outline", None);
        tracker.finish(false, "Run failed");
    }

    #[tokio::test]
    async fn test_render_loop_ends_when_trackers_drop() {
        let tracker = ProgressTracker::new();
        let handle = ConsoleRenderer::new(tracker.clone()).start_render_loop();
        drop(tracker);
        handle.await.unwrap();
    }

    #[test]
    fn test_render_lines() {
        let started = render_event(&ProgressEvent::StepStarted {
            step: "Create outline".to_string(),
            context: Some("Mara, Tomas".to_string()),
        });
        assert!(started.contains("Create outline"));
        assert!(started.contains("(after: Mara, Tomas)"));

        let skipped = render_event(&ProgressEvent::StepSkipped {
            step: "Generate title".to_string(),
            summary: "The Keeper".to_string(),
        });
        assert!(skipped.contains("[recorded] The Keeper"));

        let finished = render_event(&ProgressEvent::Finished {
            success: false,
            total_duration_secs: 90,
            summary: "Run failed".to_string(),
        });
        assert!(finished.contains("Run failed in 1m 30s"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30), "30s");
        assert_eq!(format_duration(90), "1m 30s");
        assert_eq!(format_duration(3700), "1h 1m");
    }
}
