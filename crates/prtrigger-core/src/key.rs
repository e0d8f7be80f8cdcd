//! State-store keys.
//!
//! Every piece of per-pull-request state is addressed through one of these
//! keys. Their string forms are the persisted layout:
//! `schedule:{slug}:{pullRequestId}` and
//! `suppress:{projectKey}:{slug}:{pullRequestId}`.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Identifies the (single) pending schedule of one pull request.
///
/// The string form doubles as the job key handed to the cluster job runner,
/// so duplicate schedule calls for the same pull request collapse onto one job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("schedule:{slug}:{pull_request_id}")]
pub struct ScheduleKey {
    pub slug: String,
    pub pull_request_id: i64,
}

impl ScheduleKey {
    pub fn new(slug: impl Into<String>, pull_request_id: i64) -> Self {
        Self {
            slug: slug.into(),
            pull_request_id,
        }
    }
}

/// Identifies the automatic-build suppression flag of one pull request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("suppress:{project_key}:{slug}:{pull_request_id}")]
pub struct SuppressionKey {
    pub project_key: String,
    pub slug: String,
    pub pull_request_id: i64,
}

impl SuppressionKey {
    pub fn new(
        project_key: impl Into<String>,
        slug: impl Into<String>,
        pull_request_id: i64,
    ) -> Self {
        Self {
            project_key: project_key.into(),
            slug: slug.into(),
            pull_request_id,
        }
    }
}
