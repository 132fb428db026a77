//! # tessera-scheduler — Deferred and Periodic Policy Submission
//!
//! A tick-driven job table in front of the engine: enqueue a policy
//! invocation with a recurrence, then call [`Scheduler::run_due`] on each
//! tick to replay whatever has come due. Jobs can be cancelled one at a
//! time by id or in bulk by policy name. The scheduler owns no clock and
//! no thread; the host supplies "now".

pub mod recurrence;
pub mod scheduler;

pub use recurrence::{Recurrence, Repeat};
pub use scheduler::{JobStatus, ScheduledJob, Scheduler};
