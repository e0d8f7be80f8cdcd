//! CI trigger collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Identity, Result, TriggerEventKind};

/// Everything a CI server needs to build a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRequest {
    pub repository_id: i64,
    pub latest_commit: String,
    pub pull_request_id: i64,
    pub title: String,
    pub slug: String,
    pub event: TriggerEventKind,
    /// Zero on the first attempt.
    pub retry_count: u32,
    pub endpoint: String,
    pub project_key: String,
    /// Destination repository; CI settings are looked up by it.
    pub to_slug: String,
    pub from_branch: String,
    pub to_branch: String,
}

/// Starts builds on a remote CI server.
#[async_trait]
pub trait CiTrigger: Send + Sync {
    /// Pick the CI endpoint to use for the next build of `slug`.
    /// `None` when the repository has no CI server configured.
    fn next_endpoint(&self, slug: &str) -> Option<String>;

    /// Whether `endpoint` and the repository's build settings are usable.
    fn validate(&self, endpoint: &str, slug: &str) -> bool;

    /// Start a build, running as `as_user`.
    async fn trigger(&self, as_user: &Identity, request: &TriggerRequest) -> Result<()>;
}
