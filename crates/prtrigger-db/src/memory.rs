//! In-memory implementations of the collaborator traits.
//!
//! Used for single-node mode (no `database-url`) and in tests. They follow
//! the same semantics as the PostgreSQL implementations: one job per key,
//! generation-checked completion, and at most one claim per due job.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prtrigger_core::identity::UserDirectory;
use prtrigger_core::jobs::{ClaimedJob, JobRunner, ScheduledJob};
use prtrigger_core::pull_request::PullRequestStore;
use prtrigger_core::store::StateStore;
use prtrigger_core::{Identity, PullRequest, PullRequestRef, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// In-memory key/value state.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.lock().await.contains_key(key)
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct JobEntry {
    job: ScheduledJob,
    generation: i64,
    claim: Option<(String, DateTime<Utc>)>,
}

/// In-memory run-once job runner.
#[derive(Debug, Default)]
pub struct MemoryJobRunner {
    jobs: Mutex<HashMap<String, JobEntry>>,
    schedule_calls: AtomicU64,
}

impl MemoryJobRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs waiting to fire, ordered by fire time.
    pub async fn pending(&self) -> Vec<ScheduledJob> {
        let jobs = self.jobs.lock().await;
        let mut pending: Vec<ScheduledJob> = jobs
            .values()
            .filter(|e| e.claim.is_none())
            .map(|e| e.job.clone())
            .collect();
        pending.sort_by_key(|j| j.run_at);
        pending
    }

    /// Number of `schedule_once` calls accepted so far.
    pub fn schedule_calls(&self) -> u64 {
        self.schedule_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobRunner for MemoryJobRunner {
    async fn schedule_once(&self, job: ScheduledJob) -> Result<()> {
        self.schedule_calls.fetch_add(1, Ordering::SeqCst);
        let mut jobs = self.jobs.lock().await;
        let generation = jobs.get(&job.key).map(|e| e.generation + 1).unwrap_or(1);
        jobs.insert(
            job.key.clone(),
            JobEntry {
                job,
                generation,
                claim: None,
            },
        );
        Ok(())
    }

    async fn unschedule(&self, key: &str) -> Result<bool> {
        let mut jobs = self.jobs.lock().await;
        match jobs.get(key) {
            Some(entry) if entry.claim.is_none() => {
                jobs.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn claim_due(&self, worker_id: &str, now: DateTime<Utc>) -> Result<Option<ClaimedJob>> {
        let mut jobs = self.jobs.lock().await;
        let next = jobs
            .values_mut()
            .filter(|e| e.claim.is_none() && e.job.run_at <= now)
            .min_by_key(|e| e.job.run_at);

        Ok(next.map(|entry| {
            entry.claim = Some((worker_id.to_string(), now));
            ClaimedJob {
                key: entry.job.key.clone(),
                generation: entry.generation,
                run_at: entry.job.run_at,
                payload: entry.job.payload.clone(),
            }
        }))
    }

    async fn complete(&self, job: &ClaimedJob) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        if jobs
            .get(&job.key)
            .is_some_and(|e| e.generation == job.generation)
        {
            jobs.remove(&job.key);
        }
        Ok(())
    }

    async fn release_stale(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut jobs = self.jobs.lock().await;
        let mut released = 0;
        for entry in jobs.values_mut() {
            if entry.claim.as_ref().is_some_and(|(_, at)| *at < cutoff) {
                entry.claim = None;
                released += 1;
            }
        }
        Ok(released)
    }
}

/// In-memory pull-request mirror.
#[derive(Debug, Default)]
pub struct MemoryPullRequestStore {
    pull_requests: Mutex<HashMap<PullRequestRef, PullRequest>>,
}

impl MemoryPullRequestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PullRequestStore for MemoryPullRequestStore {
    async fn upsert(&self, pull_request: &PullRequest) -> Result<()> {
        self.pull_requests
            .lock()
            .await
            .insert(pull_request.reference(), pull_request.clone());
        Ok(())
    }

    async fn remove(&self, reference: PullRequestRef) -> Result<()> {
        self.pull_requests.lock().await.remove(&reference);
        Ok(())
    }

    async fn get_by_id(&self, reference: PullRequestRef) -> Result<Option<PullRequest>> {
        Ok(self.pull_requests.lock().await.get(&reference).cloned())
    }
}

/// In-memory user directory.
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: Mutex<HashMap<String, Identity>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn remember(&self, identity: &Identity) -> Result<()> {
        self.users
            .lock()
            .await
            .insert(identity.name.clone(), identity.clone());
        Ok(())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Identity>> {
        Ok(self.users.lock().await.get(name).cloned())
    }
}
