//! Notifiers receive one [`Notification`] per completed top-level run.

use tracing::{info, warn};

use crate::models::Notification;

/// Receives the outcome of every completed top-level run.
///
/// Called from the blocking thread that executed the run, after the job record
/// has been updated. Implementations should return promptly; the job's next run
/// waits until `notify` returns.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Notifier that discards every notification. Used when none is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notification: &Notification) {}
}

/// Notifier that reports each run as a tracing event, including the rendered
/// output of failed runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) {
        if notification.failed {
            warn!(
                target: "checks",
                name = %notification.name,
                duration_ms = %notification.duration.as_millis(),
                "check failed\n{}",
                notification.output_lossy()
            );
        } else {
            info!(
                target: "checks",
                name = %notification.name,
                duration_ms = %notification.duration.as_millis(),
                "check passed"
            );
        }
    }
}
