//! Fixed-interval polling for eventually consistent state transitions.
//!
//! AWS Batch applies most changes asynchronously: a created compute
//! environment reports `CREATING` before `VALID`, a disabled queue reports
//! `UPDATING` before settling. [`poll_until`] sleeps, re-checks a condition
//! and gives up with [`Error::PollTimeout`] after a bounded number of checks.

use crate::error::{Error, Result};
use std::thread;
use std::time::Duration;

/// Interval and attempt bound of a poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay before each check
    pub interval: Duration,
    /// Maximum number of checks
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::resources()
    }
}

impl PollConfig {
    /// Create a poll config with custom settings.
    ///
    /// `max_attempts` is at least 1; the condition is always checked once.
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Resource transitions: every 3s, for up to an hour.
    pub fn resources() -> Self {
        Self::new(Duration::from_secs(3), 1200)
    }

    /// Job queue draining: every 5s, for up to a day.
    pub fn jobs() -> Self {
        Self::new(Duration::from_secs(5), 17_280)
    }

    /// Override the attempt bound.
    pub fn with_max_attempts(self, max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..self
        }
    }
}

/// Callback trait for poll progress notifications.
pub trait PollCallback {
    /// Called after a check found the condition not yet satisfied.
    fn on_wait(&self, what: &str, attempt: u32, max_attempts: u32);

    /// Called once the condition holds.
    fn on_done(&self, _what: &str, _attempts: u32) {}
}

/// No-op callback that does nothing.
pub struct NoCallback;

impl PollCallback for NoCallback {
    fn on_wait(&self, _what: &str, _attempt: u32, _max_attempts: u32) {}
}

/// Sleep, then check `condition`, until it returns `true`.
///
/// Returns the number of checks performed. Errors from `condition` abort
/// the loop immediately; API failures are never retried.
pub fn poll_until<F>(
    config: &PollConfig,
    callback: &dyn PollCallback,
    what: &str,
    mut condition: F,
) -> Result<u32>
where
    F: FnMut() -> Result<bool>,
{
    let max_attempts = config.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        thread::sleep(config.interval);

        if condition()? {
            log::debug!("{what}: satisfied after {attempt} checks");
            callback.on_done(what, attempt);
            return Ok(attempt);
        }

        log::trace!("{what}: check {attempt}/{max_attempts} not satisfied");
        callback.on_wait(what, attempt, max_attempts);
    }

    Err(Error::PollTimeout {
        what: what.to_string(),
        attempts: max_attempts,
    })
}
