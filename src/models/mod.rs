//! Domain models for scheduled checks.

pub mod job;
pub mod notification;

// Re-export commonly used types
pub use job::{HistoryEntry, JobState, JobStatus};
pub use notification::Notification;
