//! Trigger event kinds and pull-request lifecycle events.

use serde::{Deserialize, Serialize};

use crate::{Identity, PullRequest};

/// Why a build was triggered. Forwarded to the CI server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerEventKind {
    Created,
    SourceUpdated,
    Reopened,
    Forced,
}

impl std::fmt::Display for TriggerEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerEventKind::Created => write!(f, "CREATED"),
            TriggerEventKind::SourceUpdated => write!(f, "SOURCE_UPDATED"),
            TriggerEventKind::Reopened => write!(f, "REOPENED"),
            TriggerEventKind::Forced => write!(f, "FORCED"),
        }
    }
}

/// A request to trigger a build, as seen by the decision engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerIntent {
    Created,
    /// The pull request was rescoped. `head_changed` is false when the
    /// source branch head did not move.
    SourceUpdated { head_changed: bool },
    Reopened,
    Forced,
}

impl TriggerIntent {
    pub fn kind(&self) -> TriggerEventKind {
        match self {
            TriggerIntent::Created => TriggerEventKind::Created,
            TriggerIntent::SourceUpdated { .. } => TriggerEventKind::SourceUpdated,
            TriggerIntent::Reopened => TriggerEventKind::Reopened,
            TriggerIntent::Forced => TriggerEventKind::Forced,
        }
    }
}

/// Lifecycle transition of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleKind {
    Opened,
    Rescoped { previous_from_hash: String },
    Reopened,
    Merged,
    Declined,
}

/// A lifecycle notification from the event source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: LifecycleKind,
    pub pull_request: PullRequest,
    /// The user whose action produced the event.
    pub actor: Identity,
}

impl LifecycleEvent {
    /// The trigger intent of this event, or `None` for terminal transitions.
    pub fn intent(&self) -> Option<TriggerIntent> {
        match &self.kind {
            LifecycleKind::Opened => Some(TriggerIntent::Created),
            LifecycleKind::Rescoped { previous_from_hash } => Some(TriggerIntent::SourceUpdated {
                head_changed: *previous_from_hash != self.pull_request.latest_commit,
            }),
            LifecycleKind::Reopened => Some(TriggerIntent::Reopened),
            LifecycleKind::Merged | LifecycleKind::Declined => None,
        }
    }

    /// Parse a Bitbucket Server pull-request webhook payload.
    ///
    /// Returns `None` for event keys that are not pull-request lifecycle
    /// transitions, or when required fields are missing.
    pub fn from_bitbucket_payload(event_key: &str, payload: &serde_json::Value) -> Option<Self> {
        let kind = match event_key {
            "pr:opened" => LifecycleKind::Opened,
            "pr:from_ref_updated" => LifecycleKind::Rescoped {
                previous_from_hash: payload.get("previousFromHash")?.as_str()?.to_string(),
            },
            "pr:reopened" => LifecycleKind::Reopened,
            "pr:merged" => LifecycleKind::Merged,
            "pr:declined" => LifecycleKind::Declined,
            _ => return None,
        };

        let pr = payload.get("pullRequest")?;
        let from_ref = pr.get("fromRef")?;
        let to_ref = pr.get("toRef")?;
        let from_repo = from_ref.get("repository")?;
        let to_repo = to_ref.get("repository")?;

        let pull_request = PullRequest {
            id: pr.get("id")?.as_i64()?,
            repository_id: from_repo.get("id")?.as_i64()?,
            slug: from_repo.get("slug")?.as_str()?.to_string(),
            project_key: to_repo.get("project")?.get("key")?.as_str()?.to_string(),
            to_slug: to_repo.get("slug")?.as_str()?.to_string(),
            title: pr
                .get("title")
                .and_then(|t| t.as_str())
                .unwrap_or_default()
                .to_string(),
            latest_commit: from_ref.get("latestCommit")?.as_str()?.to_string(),
            from_branch: from_ref.get("id")?.as_str()?.to_string(),
            to_branch: to_ref.get("id")?.as_str()?.to_string(),
        };

        let actor = payload.get("actor")?;
        let name = actor.get("name")?.as_str()?.to_string();
        let display_name = actor
            .get("displayName")
            .and_then(|n| n.as_str())
            .unwrap_or(name.as_str())
            .to_string();

        Some(LifecycleEvent {
            kind,
            pull_request,
            actor: Identity { name, display_name },
        })
    }
}
