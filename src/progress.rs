//! Progress indicators for cmscale.

use crate::engine::{Step, WorkflowCallback};
use crate::error::ScaleError;
use crate::ui;
use cmclient::PollCallback;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Create a ticking spinner with a message.
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Finish a spinner and clear it.
pub fn finish_clear(pb: &ProgressBar) {
    pb.finish_and_clear();
}

// ============================================================================
// Poll Spinner
// ============================================================================

/// Spinner shown while a poll loop waits.
#[derive(Default)]
pub struct PollSpinner {
    current: Mutex<Option<ProgressBar>>,
    hidden: bool,
}

impl PollSpinner {
    pub fn new(hidden: bool) -> Self {
        Self {
            current: Mutex::new(None),
            hidden,
        }
    }
}

impl PollCallback for PollSpinner {
    fn on_poll(&self, label: &str, attempt: u32, max_attempts: u32) {
        if self.hidden {
            return;
        }
        let Ok(mut current) = self.current.lock() else {
            return;
        };
        let msg = format!("Waiting for {} ({}/{})", label, attempt, max_attempts);
        match current.as_ref() {
            Some(pb) => pb.set_message(msg),
            None => *current = Some(spinner(&msg)),
        }
    }

    fn on_finish(&self, _label: &str) {
        if let Ok(mut current) = self.current.lock()
            && let Some(pb) = current.take()
        {
            finish_clear(&pb);
        }
    }
}

// ============================================================================
// Step Progress
// ============================================================================

/// Prints one line per workflow step.
pub struct StepProgress {
    quiet: bool,
}

impl StepProgress {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl WorkflowCallback for StepProgress {
    fn on_step_start(&mut self, step: Step, index: usize, total: usize) {
        if !self.quiet {
            ui::step(index + 1, total, step.description());
        }
    }

    fn on_step_complete(&mut self, step: Step) {
        if !self.quiet {
            println!("  {} {}", "✓".green(), step.name().dimmed());
        }
    }

    fn on_step_failed(&mut self, step: Step, error: &ScaleError) {
        ui::error(&format!("{} failed: {}", step, error));
    }
}
