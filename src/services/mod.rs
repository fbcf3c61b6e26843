//! Job scheduling and run notification.

pub mod notifier;
pub mod runner;

pub use notifier::{LogNotifier, NoopNotifier, Notifier};
pub use runner::{DEFAULT_HISTORY_LIMIT, Job, Runner, TestFn};
