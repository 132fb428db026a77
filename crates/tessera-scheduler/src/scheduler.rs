//! # Tick-Driven Job Scheduler
//!
//! Holds deferred and periodic policy submissions and replays the due
//! ones through the engine's direct-invocation front door on every tick.
//! The scheduler never sleeps or spawns; callers decide when a tick
//! happens and what "now" is, which keeps tests and embedding hosts in
//! control of time.
//!
//! Job lifecycle:
//!
//! 1. **Pending** — waiting for its next run time.
//! 2. **Completed** — a bounded job ran its last repetition.
//! 3. **Cancelled** — cancelled before its runs were exhausted.
//!
//! A failed run of a repeating job keeps it Pending at the next interval;
//! the failure is reported in that tick's results, with no retry beyond
//! "run again next tick".

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use tessera_core::{Config, Invocation, Timestamp};
use tessera_engine::{Engine, InvocationResult};

use crate::recurrence::{Recurrence, Repeat};

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// The lifecycle status of a scheduled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for its next run time.
    Pending,
    /// A bounded job whose repetitions are exhausted.
    Completed,
    /// Cancelled before completion.
    Cancelled,
}

impl JobStatus {
    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Completed => f.write_str("completed"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

// ---------------------------------------------------------------------------
// ScheduledJob
// ---------------------------------------------------------------------------

/// A policy submission and when it next runs.
#[derive(Debug, Clone)]
pub struct ScheduledJob {
    pub id: Uuid,
    pub policy: String,
    pub invocation: Invocation,
    pub parameters: Option<Config>,
    /// Configuration layer between the parameters and the policy
    /// instance defaults, as a binding's configuration would be.
    pub configuration: Option<Config>,
    pub recurrence: Recurrence,
    pub status: JobStatus,
    pub next_run: Timestamp,
    /// Runs left for `Repeat::Times` jobs; `None` means forever.
    pub remaining: Option<u32>,
}

impl ScheduledJob {
    /// Whether this job should run at `now`.
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.status == JobStatus::Pending && self.next_run <= now
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// The job table. Due jobs run in enqueue order within a tick.
#[derive(Debug, Default)]
pub struct Scheduler {
    jobs: Vec<ScheduledJob>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a job; the first run lands `start_delay_secs` after `now`.
    ///
    /// Returns the job id for later cancellation.
    pub fn enqueue(
        &mut self,
        policy: impl Into<String>,
        invocation: Invocation,
        parameters: Option<Config>,
        configuration: Option<Config>,
        recurrence: Recurrence,
        now: Timestamp,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let remaining = match recurrence.repeat {
            Repeat::Forever => None,
            Repeat::Times(n) => Some(n),
        };
        let status = if remaining == Some(0) {
            JobStatus::Completed
        } else {
            JobStatus::Pending
        };
        self.jobs.push(ScheduledJob {
            id,
            policy: policy.into(),
            invocation,
            parameters,
            configuration,
            recurrence,
            status,
            next_run: now.plus_secs(recurrence.start_delay_secs),
            remaining,
        });
        id
    }

    /// Run every job due at `now` and advance each one's lifecycle.
    ///
    /// A bounded job with no runs left becomes Completed. A failure never
    /// completes or cancels a job; it keeps its schedule and reports a
    /// failed result for this tick.
    pub fn run_due(&mut self, now: Timestamp, engine: &mut Engine) -> Vec<InvocationResult> {
        let mut results = Vec::new();
        for job in &mut self.jobs {
            if !job.is_due(now) {
                continue;
            }

            let result = engine
                .invoke(
                    &job.policy,
                    &job.invocation,
                    job.parameters.as_ref(),
                    job.configuration.as_ref(),
                )
                .unwrap_or_else(|err| InvocationResult::failure(&job.policy, err.to_string()));
            debug!(
                policy = job.policy.as_str(),
                job_id = %job.id,
                success = result.success,
                "scheduled job ran"
            );
            results.push(result);

            match job.remaining {
                Some(n) if n <= 1 => {
                    job.remaining = Some(0);
                    job.status = JobStatus::Completed;
                }
                Some(n) => {
                    job.remaining = Some(n - 1);
                    job.next_run = now.plus_secs(job.recurrence.interval_secs);
                }
                None => {
                    job.next_run = now.plus_secs(job.recurrence.interval_secs);
                }
            }
        }
        results
    }

    /// Cancel one job by id.
    ///
    /// Returns `true` when the job was found and still cancellable,
    /// `false` when absent or already terminal.
    pub fn cancel(&mut self, id: Uuid) -> bool {
        if let Some(job) = self.jobs.iter_mut().find(|j| j.id == id) {
            if !job.status.is_terminal() {
                job.status = JobStatus::Cancelled;
                return true;
            }
        }
        false
    }

    /// Cancel every pending job submitted for a policy.
    ///
    /// Returns how many jobs were cancelled.
    pub fn cancel_policy(&mut self, policy: &str) -> usize {
        let mut cancelled = 0;
        for job in &mut self.jobs {
            if job.policy == policy && !job.status.is_terminal() {
                job.status = JobStatus::Cancelled;
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Look up a job by id.
    pub fn get(&self, id: Uuid) -> Option<&ScheduledJob> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// All jobs, in enqueue order, terminal ones included.
    pub fn jobs(&self) -> &[ScheduledJob] {
        &self.jobs
    }

    /// The jobs still waiting to run.
    pub fn pending_jobs(&self) -> Vec<&ScheduledJob> {
        self.jobs
            .iter()
            .filter(|j| j.status == JobStatus::Pending)
            .collect()
    }

    /// Drop terminal jobs from the table.
    pub fn prune(&mut self) {
        self.jobs.retain(|j| !j.status.is_terminal());
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
