//! Job runner: owns the table of scheduled checks and drives their runs.
//!
//! Locking is split in three independent scopes:
//! - the runner table lock guards the name → job map and is only held for
//!   registration, lookups and snapshots;
//! - each job has a run gate, held for the whole run so a timer tick and a
//!   forced run of the same job execute one after the other, and a short-lived
//!   record lock guarding its state, counters and history;
//! - each test context has its own lock (see [`crate::harness::T`]).
//!
//! The table lock is never acquired while a job lock is held.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::time::{MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

use crate::error::{AppError, AppResult};
use crate::harness::{self, T, TestResult};
use crate::models::{HistoryEntry, JobState, JobStatus, Notification};
use crate::services::notifier::{NoopNotifier, Notifier};

/// Default number of history entries kept per job.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// A check body as stored by the runner.
pub type TestFn = Arc<dyn Fn(&T) -> TestResult + Send + Sync>;

/// Mutable part of a job, guarded by the job's record lock.
struct Record {
    status: JobStatus,
    current: Option<Arc<T>>,
    history: VecDeque<HistoryEntry>,
}

/// A named check and its run state.
pub struct Job {
    name: String,
    test: TestFn,
    notifier: Arc<dyn Notifier>,
    history_limit: usize,
    run_gate: Mutex<()>,
    record: RwLock<Record>,
}

impl Job {
    pub(crate) fn new<F>(
        name: impl Into<String>,
        test: F,
        notifier: Arc<dyn Notifier>,
        history_limit: usize,
    ) -> Self
    where
        F: Fn(&T) -> TestResult + Send + Sync + 'static,
    {
        let name = name.into();
        Self {
            record: RwLock::new(Record {
                status: JobStatus::new(name.clone()),
                current: None,
                history: VecDeque::new(),
            }),
            name,
            test: Arc::new(test),
            notifier,
            history_limit,
            run_gate: Mutex::new(()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Record> {
        self.record.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Record> {
        self.record.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the job record. Never waits for a run in progress.
    pub fn status(&self) -> JobStatus {
        self.read().status.clone()
    }

    /// Past records of this job, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.read().history.iter().cloned().collect()
    }

    /// Rendered output of the run in progress, if any.
    pub fn live_output(&self) -> Option<Vec<u8>> {
        let current = self.read().current.clone();
        current.map(|t| t.output())
    }

    /// Run the check once, blocking until it completes.
    ///
    /// Waits for any run of this job already in progress. Snapshots the record
    /// into the history, updates it, then sends exactly one notification.
    pub(crate) fn run(&self) -> JobStatus {
        let _gate = self.run_gate.lock().unwrap_or_else(PoisonError::into_inner);

        let t = Arc::new(T::new(self.name.clone()));
        {
            let mut record = self.write();
            if record.status.has_run() {
                let entry = HistoryEntry::new(record.status.clone());
                record.history.push_back(entry);
                while record.history.len() > self.history_limit {
                    record.history.pop_front();
                }
            }
            record.status.state = JobState::Running;
            record.current = Some(Arc::clone(&t));
        }
        debug!(job = %self.name, "Run started");

        let start = Instant::now();
        harness::drive(&t, Box::new(self.test.as_ref()));
        let duration = start.elapsed();

        let failed = t.failed();
        let output = t.output();
        let status = {
            let mut record = self.write();
            let now = Utc::now();
            if failed {
                record.status.state = JobState::Failed;
                record.status.failures += 1;
                record.status.last_failure_time = Some(now);
                record.status.last_failure_output = String::from_utf8_lossy(&output).into_owned();
            } else {
                record.status.state = JobState::Passed;
                record.status.successes += 1;
                record.status.last_success_time = Some(now);
            }
            record.current = None;
            record.status.clone()
        };

        if failed {
            warn!(
                job = %self.name,
                panicked = t.panicked(),
                duration_ms = %duration.as_millis(),
                failures = status.failures,
                "Run failed"
            );
        } else {
            info!(
                job = %self.name,
                skipped = t.skipped(),
                duration_ms = %duration.as_millis(),
                "Run passed"
            );
        }

        self.notifier.notify(&Notification {
            name: self.name.clone(),
            failed,
            output,
            duration,
        });

        status
    }
}

#[derive(Default)]
struct Table {
    jobs: HashMap<String, Arc<Job>>,
}

struct Inner {
    table: RwLock<Table>,
    notifier: Arc<dyn Notifier>,
    history_limit: usize,
}

/// Table of scheduled checks. Cheap to clone; clones share the same table.
#[derive(Clone)]
pub struct Runner {
    inner: Arc<Inner>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// Create a runner that discards notifications.
    pub fn new() -> Self {
        Self::with_notifier(Arc::new(NoopNotifier))
    }

    /// Create a runner that reports every completed run to `notifier`.
    pub fn with_notifier(notifier: Arc<dyn Notifier>) -> Self {
        Self::with_options(notifier, DEFAULT_HISTORY_LIMIT)
    }

    /// Create a runner with a notifier and a per-job history bound.
    pub fn with_options(notifier: Arc<dyn Notifier>, history_limit: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                table: RwLock::new(Table::default()),
                notifier,
                history_limit,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Table> {
        self.inner.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Table> {
        self.inner.table.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a job without arming a timer. It only runs when forced.
    ///
    /// A job already registered under `name` is replaced; its timer stops at
    /// its next tick.
    pub fn register<F>(&self, name: &str, test: F) -> Arc<Job>
    where
        F: Fn(&T) -> TestResult + Send + Sync + 'static,
    {
        let job = Arc::new(Job::new(
            name,
            test,
            Arc::clone(&self.inner.notifier),
            self.inner.history_limit,
        ));
        let previous = self
            .write()
            .jobs
            .insert(name.to_string(), Arc::clone(&job));
        if previous.is_some() {
            warn!(job = %name, "Replacing existing job with the same name");
        }
        job
    }

    /// Register a job and run it every `every`, starting one interval from now.
    ///
    /// Does not block. Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, name: &str, test: F, every: Duration)
    where
        F: Fn(&T) -> TestResult + Send + Sync + 'static,
    {
        let job = self.register(name, test);
        if every.is_zero() {
            error!(job = %name, "Zero interval, job registered without a timer");
            return;
        }

        let runner = self.clone();
        tokio::spawn(async move {
            info!(
                "Scheduled job {} (interval: {} ms)",
                job.name(),
                every.as_millis()
            );

            let mut ticker = interval_at(tokio::time::Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                if !runner.is_registered(&job) {
                    info!("Job {} was replaced, stopping its timer", job.name());
                    break;
                }

                if let Err(e) = runner.execute(Arc::clone(&job)).await {
                    error!("Scheduled run of {} failed: {}", job.name(), e);
                }
            }
        });
    }

    fn is_registered(&self, job: &Arc<Job>) -> bool {
        self.read()
            .jobs
            .get(job.name())
            .is_some_and(|current| Arc::ptr_eq(current, job))
    }

    fn job(&self, name: &str) -> AppResult<Arc<Job>> {
        self.read()
            .jobs
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Job {}", name)))
    }

    async fn execute(&self, job: Arc<Job>) -> AppResult<JobStatus> {
        let status = tokio::task::spawn_blocking(move || job.run()).await?;
        Ok(status)
    }

    /// Start a run of `name` in the background and return immediately.
    ///
    /// If the job is already running, the new run starts once it completes.
    pub fn force_run(&self, name: &str) -> AppResult<()> {
        let job = self.job(name)?;
        info!("Forced run of {}", name);

        let runner = self.clone();
        tokio::spawn(async move {
            if let Err(e) = runner.execute(Arc::clone(&job)).await {
                error!("Forced run of {} failed: {}", job.name(), e);
            }
        });
        Ok(())
    }

    /// Run `name` now and wait for the result.
    pub async fn run_job(&self, name: &str) -> AppResult<JobStatus> {
        let job = self.job(name)?;
        self.execute(job).await
    }

    /// Snapshot of every job record, keyed by name.
    pub fn status(&self) -> BTreeMap<String, JobStatus> {
        self.read()
            .jobs
            .iter()
            .map(|(name, job)| (name.clone(), job.status()))
            .collect()
    }

    /// Past records of `name`, oldest first.
    pub fn history(&self, name: &str) -> AppResult<Vec<HistoryEntry>> {
        Ok(self.job(name)?.history())
    }

    /// Rendered output of the run of `name` currently in progress.
    pub fn live_output(&self, name: &str) -> AppResult<Vec<u8>> {
        let job = self.job(name)?;
        job.live_output()
            .ok_or_else(|| AppError::NotFound(format!("Run in progress for job {}", name)))
    }

    /// Registered job names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().jobs.keys().cloned().collect();
        names.sort();
        names
    }
}
