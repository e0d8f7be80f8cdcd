//! Jenkins client that starts pull-request builds.

use async_trait::async_trait;
use prtrigger_config::RepositoryConfig;
use prtrigger_core::ci::{CiTrigger, TriggerRequest};
use prtrigger_core::{Error, Identity, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Header carrying the login name the build runs as.
pub const TRIGGERED_BY_HEADER: &str = "X-Triggered-By";

/// CI settings of one repository.
#[derive(Debug)]
struct RepositoryJob {
    servers: Vec<String>,
    build_job: Option<String>,
    token: Option<String>,
    /// Round-robin position in `servers`.
    cursor: AtomicUsize,
}

/// Triggers parameterized Jenkins builds over HTTP.
pub struct JenkinsTrigger {
    client: reqwest::Client,
    jobs: HashMap<String, RepositoryJob>,
}

impl JenkinsTrigger {
    pub fn new(repositories: &[RepositoryConfig]) -> Self {
        let jobs = repositories
            .iter()
            .map(|r| {
                let job = RepositoryJob {
                    servers: r.ci_servers.clone(),
                    build_job: r.build_job.clone(),
                    token: r.token.clone(),
                    cursor: AtomicUsize::new(0),
                };
                (r.slug.clone(), job)
            })
            .collect();

        Self {
            client: reqwest::Client::new(),
            jobs,
        }
    }

    fn form(request: &TriggerRequest, token: Option<&str>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("repositoryId", request.repository_id.to_string()),
            ("latestCommit", request.latest_commit.clone()),
            ("pullRequestId", request.pull_request_id.to_string()),
            ("pullRequestTitle", request.title.clone()),
            ("slug", request.slug.clone()),
            ("triggerEvent", request.event.to_string()),
            ("retryCount", request.retry_count.to_string()),
            ("projectKey", request.project_key.clone()),
            ("fromBranch", request.from_branch.clone()),
            ("toBranch", request.to_branch.clone()),
        ];
        if let Some(token) = token {
            params.push(("token", token.to_string()));
        }
        params
    }
}

#[async_trait]
impl CiTrigger for JenkinsTrigger {
    fn next_endpoint(&self, slug: &str) -> Option<String> {
        let job = self.jobs.get(slug)?;
        if job.servers.is_empty() {
            return None;
        }
        let index = job.cursor.fetch_add(1, Ordering::Relaxed) % job.servers.len();
        Some(job.servers[index].clone())
    }

    fn validate(&self, endpoint: &str, slug: &str) -> bool {
        let Some(job) = self.jobs.get(slug) else {
            return false;
        };

        let has_job = job.build_job.as_deref().is_some_and(|j| !j.is_empty());
        !endpoint.trim().is_empty() && url::Url::parse(endpoint).is_ok() && has_job
    }

    async fn trigger(&self, as_user: &Identity, request: &TriggerRequest) -> Result<()> {
        let job = self
            .jobs
            .get(&request.to_slug)
            .ok_or_else(|| Error::Trigger(format!("no CI settings for '{}'", request.to_slug)))?;
        let build_job = job
            .build_job
            .as_deref()
            .ok_or_else(|| Error::Trigger(format!("no build job for '{}'", request.to_slug)))?;

        let url = format!(
            "{}/job/{}/buildWithParameters",
            request.endpoint.trim_end_matches('/'),
            build_job
        );
        debug!(url = %url, user = %as_user, "Posting build trigger");

        let response = self
            .client
            .post(&url)
            .header(TRIGGERED_BY_HEADER, &as_user.name)
            .form(&Self::form(request, job.token.as_deref()))
            .send()
            .await
            .map_err(|e| Error::Trigger(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Trigger(format!("{} returned {}: {}", url, status, text)));
        }

        Ok(())
    }
}
