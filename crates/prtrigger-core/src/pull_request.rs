//! Pull-request snapshots.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Result, ScheduleKey, SuppressionKey};

/// Coordinates of a pull request, enough to look it up again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub repository_id: i64,
    pub pull_request_id: i64,
}

impl std::fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.repository_id, self.pull_request_id)
    }
}

/// The latest known state of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: i64,
    /// Id of the source repository.
    pub repository_id: i64,
    /// Slug of the source repository.
    pub slug: String,
    /// Key of the destination project.
    pub project_key: String,
    /// Slug of the destination repository. Repository settings and
    /// suppression flags are scoped by it.
    pub to_slug: String,
    pub title: String,
    /// Head commit of the source branch.
    pub latest_commit: String,
    pub from_branch: String,
    pub to_branch: String,
}

impl PullRequest {
    pub fn reference(&self) -> PullRequestRef {
        PullRequestRef {
            repository_id: self.repository_id,
            pull_request_id: self.id,
        }
    }

    pub fn schedule_key(&self) -> ScheduleKey {
        ScheduleKey::new(&self.slug, self.id)
    }

    pub fn suppression_key(&self) -> SuppressionKey {
        SuppressionKey::new(&self.project_key, &self.to_slug, self.id)
    }
}

/// The live pull-request store. The trigger executor re-reads from it at
/// fire time so it never acts on the snapshot taken when the event arrived.
#[async_trait]
pub trait PullRequestStore: Send + Sync {
    /// Record the latest state of a pull request.
    async fn upsert(&self, pull_request: &PullRequest) -> Result<()>;

    /// Forget a pull request that reached a terminal state.
    async fn remove(&self, reference: PullRequestRef) -> Result<()>;

    /// Fetch a pull request. `Ok(None)` when it no longer exists.
    async fn get_by_id(&self, reference: PullRequestRef) -> Result<Option<PullRequest>>;
}
