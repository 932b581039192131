//! SurrealDB implementation of [`TokenRepository`].
//!
//! Records live in the `token` table with the card CUID as record key,
//! so lookups by token ID never scan.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tokendb_core::error::TokenDbResult;
use tokendb_core::models::token::{CreateToken, TokenFilter, TokenRecord, UpdateToken};
use tokendb_core::repository::{PaginatedResult, Pagination, TokenRepository};

use crate::error::DbError;

/// DB-side row struct for queries where the token ID is already known.
#[derive(Debug, SurrealValue)]
struct TokenRow {
    user_id: Option<String>,
    token_type: Option<String>,
    status: String,
    reason: Option<String>,
    applet_id: Option<String>,
    key_info: Option<String>,
    policy: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record key via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct TokenRowWithId {
    record_id: String,
    user_id: Option<String>,
    token_type: Option<String>,
    status: String,
    reason: Option<String>,
    applet_id: Option<String>,
    key_info: Option<String>,
    policy: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TokenRow {
    fn into_token(self, id: String) -> TokenRecord {
        TokenRecord {
            id,
            user_id: self.user_id,
            token_type: self.token_type,
            status: self.status,
            reason: self.reason,
            applet_id: self.applet_id,
            key_info: self.key_info,
            policy: self.policy,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<TokenRowWithId> for TokenRecord {
    fn from(row: TokenRowWithId) -> Self {
        TokenRecord {
            id: row.record_id,
            user_id: row.user_id,
            token_type: row.token_type,
            status: row.status,
            reason: row.reason,
            applet_id: row.applet_id,
            key_info: row.key_info,
            policy: row.policy,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn not_found(id: &str) -> DbError {
    DbError::NotFound {
        entity: "token".into(),
        id: id.to_string(),
    }
}

/// Builds the `WHERE` clause for a filter; bind names match the
/// [`TokenFilter`] field names.
fn filter_clause(filter: &TokenFilter) -> String {
    let mut conditions = Vec::new();
    if filter.token_id.is_some() {
        conditions.push("string::contains(meta::id(id), $token_id)");
    }
    if filter.user_id.is_some() {
        conditions.push("user_id != NONE AND string::contains(user_id, $user_id)");
    }
    if filter.token_type.is_some() {
        conditions.push("token_type = $token_type");
    }
    if filter.status.is_some() {
        conditions.push("status = $status");
    }

    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

/// SurrealDB implementation of the token record store.
#[derive(Clone)]
pub struct SurrealTokenRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTokenRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch(&self, id: &str) -> Result<Option<TokenRecord>, DbError> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('token', $id)")
            .bind(("id", id.to_string()))
            .await?;

        let rows: Vec<TokenRow> = result.take(0)?;
        Ok(rows.into_iter().next().map(|row| row.into_token(id.to_string())))
    }
}

impl<C: Connection> TokenRepository for SurrealTokenRepository<C> {
    async fn create(&self, input: CreateToken) -> TokenDbResult<TokenRecord> {
        if self.fetch(&input.id).await?.is_some() {
            return Err(DbError::AlreadyExists {
                entity: "token".into(),
                id: input.id,
            }
            .into());
        }

        let id = input.id;
        let result = self
            .db
            .query(
                "CREATE type::record('token', $id) SET \
                 user_id = $user_id, \
                 token_type = $token_type, \
                 status = $status, \
                 reason = $reason, \
                 applet_id = $applet_id, \
                 key_info = $key_info, \
                 policy = $policy",
            )
            .bind(("id", id.clone()))
            .bind(("user_id", input.user_id))
            .bind(("token_type", input.token_type))
            .bind(("status", input.status))
            .bind(("reason", input.reason))
            .bind(("applet_id", input.applet_id))
            .bind(("key_info", input.key_info))
            .bind(("policy", input.policy))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<TokenRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| not_found(&id))?;

        Ok(row.into_token(id))
    }

    async fn get_by_id(&self, id: &str) -> TokenDbResult<TokenRecord> {
        self.fetch(id)
            .await?
            .ok_or_else(|| not_found(id).into())
    }

    async fn update(&self, id: &str, input: UpdateToken) -> TokenDbResult<TokenRecord> {
        let mut sets = Vec::new();
        if input.user_id.is_some() {
            sets.push("user_id = $user_id");
        }
        if input.token_type.is_some() {
            sets.push("token_type = $token_type");
        }
        if input.applet_id.is_some() {
            sets.push("applet_id = $applet_id");
        }
        if input.key_info.is_some() {
            sets.push("key_info = $key_info");
        }
        if input.policy.is_some() {
            sets.push("policy = $policy");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('token', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));

        if let Some(user_id) = input.user_id {
            builder = builder.bind(("user_id", user_id));
        }
        if let Some(token_type) = input.token_type {
            builder = builder.bind(("token_type", token_type));
        }
        if let Some(applet_id) = input.applet_id {
            builder = builder.bind(("applet_id", applet_id));
        }
        if let Some(key_info) = input.key_info {
            builder = builder.bind(("key_info", key_info));
        }
        if let Some(policy) = input.policy {
            builder = builder.bind(("policy", policy));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<TokenRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| not_found(id))?;

        Ok(row.into_token(id.to_string()))
    }

    async fn set_status(
        &self,
        id: &str,
        status: &str,
        reason: Option<&str>,
    ) -> TokenDbResult<TokenRecord> {
        let result = self
            .db
            .query(
                "UPDATE type::record('token', $id) SET \
                 status = $status, \
                 reason = $reason, \
                 updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("status", status.to_string()))
            .bind(("reason", reason.map(str::to_string)))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<TokenRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| not_found(id))?;

        Ok(row.into_token(id.to_string()))
    }

    async fn delete(&self, id: &str) -> TokenDbResult<()> {
        self.db
            .query("DELETE type::record('token', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn find(
        &self,
        filter: TokenFilter,
        pagination: Pagination,
    ) -> TokenDbResult<PaginatedResult<TokenRecord>> {
        let where_clause = filter_clause(&filter);

        let count_query = format!("SELECT count() AS total FROM token{where_clause} GROUP ALL");
        let list_query = format!(
            "SELECT meta::id(id) AS record_id, * FROM token{where_clause} \
             ORDER BY created_at ASC \
             LIMIT $limit START $offset"
        );

        let mut result = self
            .db
            .query(count_query)
            .query(list_query)
            .bind(("token_id", filter.token_id))
            .bind(("user_id", filter.user_id))
            .bind(("token_type", filter.token_type))
            .bind(("status", filter.status))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let rows: Vec<TokenRowWithId> = result.take(1).map_err(DbError::from)?;
        let items = rows.into_iter().map(TokenRecord::from).collect();

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
