//! SurrealDB implementation of [`ActivityRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tokendb_core::error::TokenDbResult;
use tokendb_core::models::activity::{
    ActivityOutcome, CreateTokenActivity, TokenActivity, TokenOperation,
};
use tokendb_core::repository::{ActivityRepository, PaginatedResult, Pagination};
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ActivityRow {
    record_id: String,
    token_id: String,
    user_id: Option<String>,
    operation: String,
    outcome: String,
    message: String,
    metadata: serde_json::Value,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn outcome_to_string(outcome: ActivityOutcome) -> &'static str {
    match outcome {
        ActivityOutcome::Success => "Success",
        ActivityOutcome::Failure => "Failure",
    }
}

fn parse_outcome(s: &str) -> Result<ActivityOutcome, DbError> {
    match s {
        "Success" => Ok(ActivityOutcome::Success),
        "Failure" => Ok(ActivityOutcome::Failure),
        other => Err(DbError::Corrupt(format!("unknown activity outcome: {other}"))),
    }
}

impl ActivityRow {
    fn try_into_activity(self) -> Result<TokenActivity, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        let operation = TokenOperation::parse(&self.operation).ok_or_else(|| {
            DbError::Corrupt(format!("unknown token operation: {}", self.operation))
        })?;
        Ok(TokenActivity {
            id,
            token_id: self.token_id,
            user_id: self.user_id,
            operation,
            outcome: parse_outcome(&self.outcome)?,
            message: self.message,
            metadata: self.metadata,
            timestamp: self.timestamp,
        })
    }
}

/// SurrealDB implementation of the append-only token activity log.
#[derive(Clone)]
pub struct SurrealActivityRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealActivityRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ActivityRepository for SurrealActivityRepository<C> {
    async fn append(&self, input: CreateTokenActivity) -> TokenDbResult<TokenActivity> {
        let id_str = Uuid::new_v4().to_string();
        let metadata = input
            .metadata
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()));

        let result = self
            .db
            .query(
                "CREATE type::record('token_activity', $id) SET \
                 token_id = $token_id, \
                 user_id = $user_id, \
                 operation = $operation, \
                 outcome = $outcome, \
                 message = $message, \
                 metadata = $metadata",
            )
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('token_activity', $id)",
            )
            .bind(("id", id_str.clone()))
            .bind(("token_id", input.token_id))
            .bind(("user_id", input.user_id))
            .bind(("operation", input.operation.as_str()))
            .bind(("outcome", outcome_to_string(input.outcome)))
            .bind(("message", input.message))
            .bind(("metadata", metadata))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ActivityRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "token_activity".into(),
            id: id_str,
        })?;

        Ok(row.try_into_activity()?)
    }

    async fn list_by_token(
        &self,
        token_id: &str,
        pagination: Pagination,
    ) -> TokenDbResult<PaginatedResult<TokenActivity>> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM token_activity \
                 WHERE token_id = $token_id GROUP ALL",
            )
            .query(
                "SELECT meta::id(id) AS record_id, * FROM token_activity \
                 WHERE token_id = $token_id \
                 ORDER BY timestamp ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("token_id", token_id.to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let rows: Vec<ActivityRow> = result.take(1).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_activity())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
