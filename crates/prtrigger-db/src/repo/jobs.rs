//! Cluster job runner backed by the `scheduled_jobs` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prtrigger_core::Result;
use prtrigger_core::jobs::{ClaimedJob, JobPayload, JobRunner, ScheduledJob};
use sqlx::PgPool;

use crate::DbError;

/// A claimed job row.
#[derive(Debug, Clone, sqlx::FromRow)]
struct JobRow {
    job_key: String,
    payload: serde_json::Value,
    run_at: DateTime<Utc>,
    generation: i64,
}

impl TryFrom<JobRow> for ClaimedJob {
    type Error = DbError;

    fn try_from(row: JobRow) -> std::result::Result<Self, Self::Error> {
        let payload: JobPayload = serde_json::from_value(row.payload)?;
        Ok(ClaimedJob {
            key: row.job_key,
            generation: row.generation,
            run_at: row.run_at,
            payload,
        })
    }
}

/// PostgreSQL implementation of JobRunner.
///
/// The job key is the primary key, so any number of nodes racing to
/// schedule the same pull request end up with a single row. Claiming uses
/// SKIP LOCKED so each due row is handed to exactly one node.
pub struct PgJobRunner {
    pool: PgPool,
}

impl PgJobRunner {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRunner for PgJobRunner {
    async fn schedule_once(&self, job: ScheduledJob) -> Result<()> {
        let payload = serde_json::to_value(&job.payload).map_err(DbError::from)?;
        sqlx::query(
            r#"
            INSERT INTO scheduled_jobs (job_key, payload, run_at, generation, status, created_at)
            VALUES ($1, $2, $3, 1, 'pending', NOW())
            ON CONFLICT (job_key) DO UPDATE
            SET payload = EXCLUDED.payload,
                run_at = EXCLUDED.run_at,
                generation = scheduled_jobs.generation + 1,
                status = 'pending',
                claimed_by = NULL,
                claimed_at = NULL
            "#,
        )
        .bind(&job.key)
        .bind(payload)
        .bind(job.run_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }

    async fn unschedule(&self, key: &str) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM scheduled_jobs WHERE job_key = $1 AND status = 'pending'")
                .bind(key)
                .execute(&self.pool)
                .await
                .map_err(DbError::from)?;
        Ok(result.rows_affected() > 0)
    }

    async fn claim_due(&self, worker_id: &str, now: DateTime<Utc>) -> Result<Option<ClaimedJob>> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE scheduled_jobs
            SET status = 'claimed', claimed_by = $1, claimed_at = $2
            WHERE job_key = (
                SELECT job_key FROM scheduled_jobs
                WHERE status = 'pending' AND run_at <= $2
                ORDER BY run_at ASC
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING job_key, payload, run_at, generation
            "#,
        )
        .bind(worker_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        match row {
            Some(row) => Ok(Some(ClaimedJob::try_from(row)?)),
            None => Ok(None),
        }
    }

    async fn complete(&self, job: &ClaimedJob) -> Result<()> {
        sqlx::query("DELETE FROM scheduled_jobs WHERE job_key = $1 AND generation = $2")
            .bind(&job.key)
            .bind(job.generation)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    async fn release_stale(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE scheduled_jobs
            SET status = 'pending', claimed_by = NULL, claimed_at = NULL
            WHERE status = 'claimed' AND claimed_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(result.rows_affected())
    }
}
