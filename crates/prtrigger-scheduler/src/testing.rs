//! Test fixtures shared by the scheduler modules.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prtrigger_core::ci::{CiTrigger, TriggerRequest};
use prtrigger_core::jobs::{ClaimedJob, JobRunner, ScheduledJob};
use prtrigger_core::settings::SettingsSource;
use prtrigger_core::store::StateStore;
use prtrigger_core::{
    Error, Identity, JobPayload, PullRequest, RepositorySettings, Result, TriggerEventKind,
};
use std::sync::Mutex;
use std::time::Duration;

pub const BASE_MILLIS: i64 = 1_700_000_000_000;

/// `secs` seconds after a fixed base instant.
pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(BASE_MILLIS + secs * 1_000).unwrap()
}

pub fn payload(event: TriggerEventKind) -> JobPayload {
    JobPayload {
        pull_request_id: 7,
        repository_id: 84,
        slug: "repo-a".to_string(),
        event,
        user: "alice".to_string(),
    }
}

pub fn pull_request() -> PullRequest {
    PullRequest {
        id: 7,
        repository_id: 84,
        slug: "repo-a".to_string(),
        project_key: "PROJ".to_string(),
        to_slug: "repo-a".to_string(),
        title: "Add widgets".to_string(),
        latest_commit: "ef8755f06ee4b28c96a847a95cb8ec8ed6ddd1ca".to_string(),
        from_branch: "refs/heads/feature".to_string(),
        to_branch: "refs/heads/main".to_string(),
    }
}

pub fn alice() -> Identity {
    Identity::new("alice", "Alice Example")
}

/// The same settings for every repository.
pub struct FixedSettings(pub RepositorySettings);

#[async_trait]
impl SettingsSource for FixedSettings {
    async fn settings_for(&self, _slug: &str) -> Result<RepositorySettings> {
        Ok(self.0.clone())
    }
}

/// A job runner that rejects everything.
pub struct FailingJobRunner;

#[async_trait]
impl JobRunner for FailingJobRunner {
    async fn schedule_once(&self, _job: ScheduledJob) -> Result<()> {
        Err(Error::Scheduling("runner unavailable".to_string()))
    }

    async fn unschedule(&self, _key: &str) -> Result<bool> {
        Err(Error::Scheduling("runner unavailable".to_string()))
    }

    async fn claim_due(&self, _worker_id: &str, _now: DateTime<Utc>) -> Result<Option<ClaimedJob>> {
        Err(Error::Scheduling("runner unavailable".to_string()))
    }

    async fn complete(&self, _job: &ClaimedJob) -> Result<()> {
        Err(Error::Scheduling("runner unavailable".to_string()))
    }

    async fn release_stale(&self, _cutoff: DateTime<Utc>) -> Result<u64> {
        Err(Error::Scheduling("runner unavailable".to_string()))
    }
}

/// A state store whose reads fail. Writes succeed and are dropped.
pub struct BrokenReadStore;

#[async_trait]
impl StateStore for BrokenReadStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(Error::Store("connection reset".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiBehavior {
    Accept,
    NoEndpoint,
    Invalid,
    Reject,
    Hang,
}

/// Records every trigger call and behaves as configured.
pub struct MockCi {
    behavior: CiBehavior,
    calls: Mutex<Vec<(Identity, TriggerRequest)>>,
    lookups: Mutex<Vec<String>>,
}

impl MockCi {
    pub fn new(behavior: CiBehavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
            lookups: Mutex::new(Vec::new()),
        }
    }

    /// Slugs passed to `next_endpoint`, in order.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<(Identity, TriggerRequest)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CiTrigger for MockCi {
    fn next_endpoint(&self, slug: &str) -> Option<String> {
        self.lookups.lock().unwrap().push(slug.to_string());
        match self.behavior {
            CiBehavior::NoEndpoint => None,
            _ => Some("https://ci.example.com".to_string()),
        }
    }

    fn validate(&self, _endpoint: &str, _slug: &str) -> bool {
        self.behavior != CiBehavior::Invalid
    }

    async fn trigger(&self, as_user: &Identity, request: &TriggerRequest) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((as_user.clone(), request.clone()));
        match self.behavior {
            CiBehavior::Reject => Err(Error::Trigger("HTTP 500".to_string())),
            CiBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
