//! Cluster job runner contract.
//!
//! The job runner is the only cross-node exclusion primitive: it keeps at most
//! one schedule per job key and hands each due job to exactly one node.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, ScheduleKey, TriggerEventKind};

/// Immutable snapshot captured when a trigger is accepted.
///
/// Carries coordinates and identity only. The executor re-fetches the live
/// pull request at fire time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPayload {
    pub pull_request_id: i64,
    pub repository_id: i64,
    pub slug: String,
    pub event: TriggerEventKind,
    /// Login name of the user the build must run as.
    pub user: String,
}

impl JobPayload {
    pub fn schedule_key(&self) -> ScheduleKey {
        ScheduleKey::new(&self.slug, self.pull_request_id)
    }
}

/// A run-once job to hand to the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub key: String,
    pub run_at: DateTime<Utc>,
    pub payload: JobPayload,
}

/// A due job claimed by one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimedJob {
    pub key: String,
    /// Bumped every time the key is rescheduled. Completing a claim only
    /// removes the schedule if the generation still matches.
    pub generation: i64,
    pub run_at: DateTime<Utc>,
    pub payload: JobPayload,
}

#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Schedule a run-once job. Scheduling a key that is already pending
    /// replaces it instead of adding a second job.
    async fn schedule_once(&self, job: ScheduledJob) -> Result<()>;

    /// Cancel a pending job. Returns whether one was pending. A job that is
    /// already running is not affected.
    async fn unschedule(&self, key: &str) -> Result<bool>;

    /// Claim at most one job whose fire time is at or before `now`.
    async fn claim_due(&self, worker_id: &str, now: DateTime<Utc>) -> Result<Option<ClaimedJob>>;

    /// Mark a claimed job as done and drop its schedule.
    async fn complete(&self, job: &ClaimedJob) -> Result<()>;

    /// Return claims taken before `cutoff` to pending (crashed nodes).
    async fn release_stale(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// How one execution of a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The CI server accepted the build.
    Triggered,
    /// The pull request no longer exists. Nothing to do.
    SubjectGone,
    /// CI settings are missing or invalid. Reported as a warning.
    Misconfigured,
    /// Identity resolution or the CI call failed.
    Failed(String),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, ExecutionOutcome::Failed(_))
    }
}

/// Handler invoked by the job runner when a job fires.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn run(&self, payload: JobPayload) -> ExecutionOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_failures_are_unsuccessful() {
        assert!(ExecutionOutcome::Triggered.is_success());
        assert!(ExecutionOutcome::SubjectGone.is_success());
        assert!(ExecutionOutcome::Misconfigured.is_success());
        assert!(!ExecutionOutcome::Failed("HTTP 500".to_string()).is_success());
    }
}
