//! Database error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type DbResult<T> = std::result::Result<T, DbError>;

impl From<DbError> for prtrigger_core::Error {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(msg) => prtrigger_core::Error::NotFound(msg),
            other => prtrigger_core::Error::Store(other.to_string()),
        }
    }
}
