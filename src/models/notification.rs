//! Notification emitted after every completed top-level run.

use std::time::Duration;

/// Outcome of one top-level run, handed to the configured notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub name: String,
    pub failed: bool,
    /// Rendered test output
    pub output: Vec<u8>,
    pub duration: Duration,
}

impl Notification {
    /// Output as text, replacing invalid UTF-8.
    pub fn output_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.output)
    }
}
