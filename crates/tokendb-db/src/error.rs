//! Database-specific error types and conversions.

use tokendb_core::error::TokenDbError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity} with id {id}")]
    AlreadyExists { entity: String, id: String },
}

impl From<DbError> for TokenDbError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => TokenDbError::NotFound { entity, id },
            DbError::AlreadyExists { entity, id } => TokenDbError::AlreadyExists { entity, id },
            other => TokenDbError::Dependency(other.to_string()),
        }
    }
}
