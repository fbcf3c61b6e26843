//! Scheduled job domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Run state of a scheduled job.
///
/// `Idle` only applies before the first run; afterwards a job cycles between
/// `Running` and one of the terminal states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum JobState {
    #[default]
    #[serde(rename = "")]
    Idle,
    #[serde(rename = "RUNNING")]
    Running,
    #[serde(rename = "PASSED")]
    Passed,
    #[serde(rename = "FAILED")]
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "",
            Self::Running => "RUNNING",
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "" => Some(Self::Idle),
            "RUNNING" => Some(Self::Running),
            "PASSED" => Some(Self::Passed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Point-in-time view of a job record, as served by the status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct JobStatus {
    /// Job name
    pub name: String,
    /// Current run state
    pub state: JobState,
    /// When the job last transitioned into `PASSED`
    pub last_success_time: Option<DateTime<Utc>>,
    /// When the job last transitioned into `FAILED`
    pub last_failure_time: Option<DateTime<Utc>>,
    /// Rendered output of the most recent failing run
    pub last_failure_output: String,
    /// Number of failed runs
    pub failures: u64,
    /// Number of passed runs
    pub successes: u64,
}

impl JobStatus {
    /// Create the record of a job that has never run.
    pub fn new(name: impl Into<String>) -> Self {
        JobStatus {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Whether the job has completed at least one run.
    pub fn has_run(&self) -> bool {
        self.successes > 0 || self.failures > 0
    }
}

/// Snapshot of a job record taken just before it was run again.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct HistoryEntry {
    /// When the snapshot was taken
    pub recorded_at: DateTime<Utc>,
    /// The record as it was before the run
    #[serde(flatten)]
    pub status: JobStatus,
}

impl HistoryEntry {
    pub fn new(status: JobStatus) -> Self {
        HistoryEntry {
            recorded_at: Utc::now(),
            status,
        }
    }
}
