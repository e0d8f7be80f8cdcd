//! Pull-request mirror backed by the `pull_requests` table.

use async_trait::async_trait;
use prtrigger_core::pull_request::PullRequestStore;
use prtrigger_core::{PullRequest, PullRequestRef, Result};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
struct PullRequestRow {
    repository_id: i64,
    pull_request_id: i64,
    slug: String,
    project_key: String,
    to_slug: String,
    title: String,
    latest_commit: String,
    from_branch: String,
    to_branch: String,
}

impl From<PullRequestRow> for PullRequest {
    fn from(row: PullRequestRow) -> Self {
        PullRequest {
            id: row.pull_request_id,
            repository_id: row.repository_id,
            slug: row.slug,
            project_key: row.project_key,
            to_slug: row.to_slug,
            title: row.title,
            latest_commit: row.latest_commit,
            from_branch: row.from_branch,
            to_branch: row.to_branch,
        }
    }
}

/// PostgreSQL implementation of PullRequestStore.
pub struct PgPullRequestStore {
    pool: PgPool,
}

impl PgPullRequestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PullRequestStore for PgPullRequestStore {
    async fn upsert(&self, pull_request: &PullRequest) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pull_requests
                (repository_id, pull_request_id, slug, project_key, to_slug, title,
                 latest_commit, from_branch, to_branch, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
            ON CONFLICT (repository_id, pull_request_id) DO UPDATE
            SET slug = EXCLUDED.slug,
                project_key = EXCLUDED.project_key,
                to_slug = EXCLUDED.to_slug,
                title = EXCLUDED.title,
                latest_commit = EXCLUDED.latest_commit,
                from_branch = EXCLUDED.from_branch,
                to_branch = EXCLUDED.to_branch,
                updated_at = NOW()
            "#,
        )
        .bind(pull_request.repository_id)
        .bind(pull_request.id)
        .bind(&pull_request.slug)
        .bind(&pull_request.project_key)
        .bind(&pull_request.to_slug)
        .bind(&pull_request.title)
        .bind(&pull_request.latest_commit)
        .bind(&pull_request.from_branch)
        .bind(&pull_request.to_branch)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }

    async fn remove(&self, reference: PullRequestRef) -> Result<()> {
        sqlx::query("DELETE FROM pull_requests WHERE repository_id = $1 AND pull_request_id = $2")
            .bind(reference.repository_id)
            .bind(reference.pull_request_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    async fn get_by_id(&self, reference: PullRequestRef) -> Result<Option<PullRequest>> {
        let row = sqlx::query_as::<_, PullRequestRow>(
            r#"
            SELECT repository_id, pull_request_id, slug, project_key, to_slug, title,
                   latest_commit, from_branch, to_branch
            FROM pull_requests
            WHERE repository_id = $1 AND pull_request_id = $2
            "#,
        )
        .bind(reference.repository_id)
        .bind(reference.pull_request_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(row.map(PullRequest::from))
    }
}
