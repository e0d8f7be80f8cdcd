//! User directory backed by the `users` table.

use async_trait::async_trait;
use prtrigger_core::identity::UserDirectory;
use prtrigger_core::{Identity, Result};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRow {
    name: String,
    display_name: String,
}

/// PostgreSQL implementation of UserDirectory.
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn remember(&self, identity: &Identity) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (name, display_name, last_seen_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (name) DO UPDATE
            SET display_name = EXCLUDED.display_name, last_seen_at = NOW()
            "#,
        )
        .bind(&identity.name)
        .bind(&identity.display_name)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Identity>> {
        let row =
            sqlx::query_as::<_, UserRow>("SELECT name, display_name FROM users WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(DbError::from)?;
        Ok(row.map(|r| Identity::new(r.name, r.display_name)))
    }
}
