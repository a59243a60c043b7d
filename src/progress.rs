//! Progress reporting for long integrations.

use tracing::info;

/// Snapshot passed to a [`ProgressReporter`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Number of sub-steps taken so far.
    pub steps: usize,
    /// Current time.
    pub time: f64,
    /// `time / tf * 100`, where `tf` is the final checkpoint time.
    pub percent: f64,
}

/// Receives periodic [`Progress`] updates during an integration.
///
/// Implemented for any `FnMut(&Progress)` closure.
pub trait ProgressReporter {
    fn report(&mut self, progress: &Progress);
}

/// Discards all progress updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&mut self, _progress: &Progress) {}
}

/// Emits each progress update as an `INFO` level `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&mut self, progress: &Progress) {
        info!(
            steps = progress.steps,
            time = progress.time,
            "percent completed: {:.2}",
            progress.percent
        );
    }
}

impl<F> ProgressReporter for F
where
    F: FnMut(&Progress),
{
    fn report(&mut self, progress: &Progress) {
        self(progress)
    }
}
