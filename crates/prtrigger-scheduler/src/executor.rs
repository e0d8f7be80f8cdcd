//! Trigger executor.
//!
//! Runs on exactly one node when a scheduled job fires. Re-reads the pull
//! request, picks a CI endpoint, resolves the captured user and starts the
//! build as that user. The pending marker is cleared on every path so the
//! next accepted event can schedule again.

use async_trait::async_trait;
use prtrigger_core::ci::{CiTrigger, TriggerRequest};
use prtrigger_core::identity::UserDirectory;
use prtrigger_core::jobs::{ExecutionOutcome, JobHandler};
use prtrigger_core::pull_request::PullRequestStore;
use prtrigger_core::{JobPayload, PullRequestRef};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::marker::PendingMarkers;

pub struct TriggerExecutor {
    pull_requests: Arc<dyn PullRequestStore>,
    users: Arc<dyn UserDirectory>,
    ci: Arc<dyn CiTrigger>,
    markers: PendingMarkers,
    trigger_timeout: Duration,
}

impl TriggerExecutor {
    pub fn new(
        pull_requests: Arc<dyn PullRequestStore>,
        users: Arc<dyn UserDirectory>,
        ci: Arc<dyn CiTrigger>,
        markers: PendingMarkers,
        trigger_timeout: Duration,
    ) -> Self {
        Self {
            pull_requests,
            users,
            ci,
            markers,
            trigger_timeout,
        }
    }

    pub async fn execute(&self, payload: &JobPayload) -> ExecutionOutcome {
        let outcome = self.trigger(payload).await;

        let key = payload.schedule_key();
        if let Err(e) = self.markers.clear(&key).await {
            warn!(key = %key, error = %e, "Failed to clear schedule marker");
        }

        outcome
    }

    async fn trigger(&self, payload: &JobPayload) -> ExecutionOutcome {
        let reference = PullRequestRef {
            repository_id: payload.repository_id,
            pull_request_id: payload.pull_request_id,
        };

        let pull_request = match self.pull_requests.get_by_id(reference).await {
            Ok(Some(pr)) => pr,
            Ok(None) => {
                warn!(pull_request = %reference, "Pull request no longer exists, skipping build");
                return ExecutionOutcome::SubjectGone;
            }
            Err(e) => {
                error!(pull_request = %reference, error = %e, "Failed to load pull request");
                return ExecutionOutcome::Failed(e.to_string());
            }
        };

        let Some(endpoint) = self.ci.next_endpoint(&pull_request.to_slug) else {
            warn!(slug = %pull_request.to_slug, "No CI server configured, skipping build");
            return ExecutionOutcome::Misconfigured;
        };

        if !self.ci.validate(&endpoint, &pull_request.to_slug) {
            warn!(
                slug = %pull_request.to_slug,
                endpoint = %endpoint,
                "CI settings are invalid, skipping build"
            );
            return ExecutionOutcome::Misconfigured;
        }

        let user = match self.users.find_by_name(&payload.user).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                error!(user = %payload.user, "Triggering user is unknown");
                return ExecutionOutcome::Failed(format!("unknown user: {}", payload.user));
            }
            Err(e) => {
                error!(user = %payload.user, error = %e, "Failed to resolve triggering user");
                return ExecutionOutcome::Failed(e.to_string());
            }
        };

        let request = TriggerRequest {
            repository_id: pull_request.repository_id,
            latest_commit: pull_request.latest_commit,
            pull_request_id: pull_request.id,
            title: pull_request.title,
            slug: pull_request.slug,
            event: payload.event,
            retry_count: 0,
            endpoint,
            project_key: pull_request.project_key,
            to_slug: pull_request.to_slug,
            from_branch: pull_request.from_branch,
            to_branch: pull_request.to_branch,
        };

        match tokio::time::timeout(self.trigger_timeout, self.ci.trigger(&user, &request)).await {
            Ok(Ok(())) => {
                info!(
                    pull_request = %reference,
                    slug = %request.slug,
                    commit = %request.latest_commit,
                    event = %request.event,
                    user = %user,
                    endpoint = %request.endpoint,
                    "Triggered build"
                );
                ExecutionOutcome::Triggered
            }
            Ok(Err(e)) => {
                error!(pull_request = %reference, error = %e, "CI server rejected build trigger");
                ExecutionOutcome::Failed(e.to_string())
            }
            Err(_) => {
                error!(
                    pull_request = %reference,
                    timeout_secs = self.trigger_timeout.as_secs_f64(),
                    "Build trigger timed out"
                );
                ExecutionOutcome::Failed(format!(
                    "timed out after {}s",
                    self.trigger_timeout.as_secs_f64()
                ))
            }
        }
    }
}

#[async_trait]
impl JobHandler for TriggerExecutor {
    async fn run(&self, payload: JobPayload) -> ExecutionOutcome {
        self.execute(&payload).await
    }
}
