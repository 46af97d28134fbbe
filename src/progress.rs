//! Progress indicators for the beagle CLI.

use batchkit::PollCallback;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(100);

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Start a steadily ticking spinner
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(TICK);
    pb
}

/// Finish a spinner with a success mark
pub fn finish_success(pb: &ProgressBar, msg: &str) {
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{msg}")
            .unwrap_or_else(|_| spinner_style()),
    );
    pb.finish_with_message(format!("{} {}", "✓".green(), msg));
}

/// Remove a spinner from the terminal
pub fn finish_clear(pb: &ProgressBar) {
    pb.finish_and_clear();
}

// ============================================================================
// Poll progress
// ============================================================================

/// Shows one spinner per wait, labelled with the attempt count.
///
/// The spinner appears on the first unsatisfied check and is replaced by a
/// success line once the wait completes.
#[derive(Default)]
pub struct PollSpinner {
    current: RefCell<Option<ProgressBar>>,
}

impl PollSpinner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PollCallback for PollSpinner {
    fn on_wait(&self, what: &str, attempt: u32, max_attempts: u32) {
        let mut current = self.current.borrow_mut();
        let pb = current.get_or_insert_with(|| spinner(&format!("Waiting for {what}")));
        pb.set_message(format!(
            "Waiting for {what} {}",
            format!("[{attempt}/{max_attempts}]").dimmed()
        ));
    }

    fn on_done(&self, what: &str, attempts: u32) {
        if let Some(pb) = self.current.borrow_mut().take() {
            finish_success(&pb, &format!("Done waiting for {what} ({attempts} checks)"));
        }
    }
}

impl Drop for PollSpinner {
    fn drop(&mut self) {
        if let Some(pb) = self.current.get_mut().take() {
            finish_clear(&pb);
        }
    }
}
