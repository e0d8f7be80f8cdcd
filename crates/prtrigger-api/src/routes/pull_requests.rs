//! Forced trigger and automatic-build endpoints for a single pull request.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use prtrigger_core::{Identity, PullRequestRef};
use prtrigger_scheduler::{ForceOutcome, SuppressionState};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info};

use crate::AppState;
use crate::error::ApiError;

/// Login name of the authenticated caller, set by the fronting proxy.
pub const REMOTE_USER_HEADER: &str = "X-Remote-User";
/// Optional display name of the caller.
pub const REMOTE_DISPLAY_NAME_HEADER: &str = "X-Remote-Display-Name";

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{repo_id}/pull-requests/{pr_id}/trigger",
            post(force_trigger),
        )
        .route(
            "/{repo_id}/pull-requests/{pr_id}/automatic-build",
            get(get_automatic_build).put(set_automatic_build),
        )
}

#[derive(Debug, Serialize)]
pub struct AutomaticBuildResponse {
    pub repository_id: i64,
    pub pull_request_id: i64,
    pub state: SuppressionState,
}

#[derive(Debug, Deserialize)]
pub struct SetAutomaticBuildRequest {
    pub enabled: bool,
}

fn caller(headers: &HeaderMap) -> Result<Identity, ApiError> {
    let name = headers
        .get(REMOTE_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))?;

    let display_name = headers
        .get(REMOTE_DISPLAY_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(name);

    Ok(Identity::new(name, display_name))
}

/// Schedule a forced build that replaces whatever is pending.
async fn force_trigger(
    State(state): State<AppState>,
    Path((repo_id, pr_id)): Path<(i64, i64)>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user = caller(&headers)?;
    let reference = PullRequestRef {
        repository_id: repo_id,
        pull_request_id: pr_id,
    };

    match state.intake.force_schedule(reference, &user).await {
        ForceOutcome::Ok { fire_at } => {
            info!(pull_request = %reference, user = %user, "Manually triggered build");
            Ok((
                StatusCode::ACCEPTED,
                Json(json!({
                    "repository_id": repo_id,
                    "pull_request_id": pr_id,
                    "fire_at": fire_at,
                })),
            ))
        }
        ForceOutcome::NotFound => Err(ApiError::NotFound(format!(
            "pull request {} in repository {}",
            pr_id, repo_id
        ))),
        ForceOutcome::SchedulingError(message) => {
            error!(pull_request = %reference, error = %message, "Manual trigger failed");
            Err(ApiError::Internal(format!(
                "failed to schedule build for pull request {}: {}",
                reference, message
            )))
        }
    }
}

async fn get_automatic_build(
    State(state): State<AppState>,
    Path((repo_id, pr_id)): Path<(i64, i64)>,
) -> Result<Json<AutomaticBuildResponse>, ApiError> {
    let reference = PullRequestRef {
        repository_id: repo_id,
        pull_request_id: pr_id,
    };
    let state = state.intake.automatic_build_status(reference).await?;
    Ok(Json(AutomaticBuildResponse {
        repository_id: repo_id,
        pull_request_id: pr_id,
        state,
    }))
}

async fn set_automatic_build(
    State(state): State<AppState>,
    Path((repo_id, pr_id)): Path<(i64, i64)>,
    headers: HeaderMap,
    Json(request): Json<SetAutomaticBuildRequest>,
) -> Result<Json<AutomaticBuildResponse>, ApiError> {
    let user = caller(&headers)?;
    let reference = PullRequestRef {
        repository_id: repo_id,
        pull_request_id: pr_id,
    };

    let new_state = state
        .intake
        .set_automatic_build(reference, request.enabled)
        .await?;
    info!(pull_request = %reference, user = %user, state = ?new_state, "Automatic build toggled");

    Ok(Json(AutomaticBuildResponse {
        repository_id: repo_id,
        pull_request_id: pr_id,
        state: new_state,
    }))
}
