//! Token service: validated status transitions and record maintenance.
//!
//! A status change runs, under the token's lock:
//!
//! 1. load the record and decode its current logical status,
//! 2. check the move against the [`TransitionTable`],
//! 3. plan the persisted pair and certificate action from the *previous*
//!    persisted pair,
//! 4. call the revocation gateway,
//! 5. persist the new pair.
//!
//! Steps 4 and 5 are not atomic. If the gateway succeeds and the persist
//! fails, certificates and token disagree until the caller retries; the
//! gateway is idempotent, so a retry converges.

use std::sync::Arc;

use serde_json::json;
use tokendb_core::error::{TokenDbError, TokenDbResult};
use tokendb_core::models::activity::{ActivityOutcome, CreateTokenActivity, TokenOperation};
use tokendb_core::models::token::{
    CreateToken, STATUS_UNINITIALIZED, TokenFilter, TokenRecord, TokenStatus, UpdateToken,
};
use tokendb_core::repository::{
    ActivityRepository, PaginatedResult, Pagination, RevocationGateway, TokenRepository,
};
use tracing::{debug, error, info, warn};

use crate::config::LifecycleConfig;
use crate::lock::TokenLocks;
use crate::status::{CertificateAction, StatusChange};
use crate::transition::TransitionTable;

/// Input for registering a new token.
#[derive(Debug, Clone, Default)]
pub struct NewToken {
    pub id: String,
    pub user_id: Option<String>,
    pub token_type: Option<String>,
    /// Ignored: new tokens always start `uninitialized`.
    pub status: Option<String>,
    pub applet_id: Option<String>,
    pub key_info: Option<String>,
    pub policy: Option<String>,
}

/// Full set of descriptive fields, for replacing a record wholesale.
#[derive(Debug, Clone, Default)]
pub struct TokenFields {
    pub user_id: Option<String>,
    pub token_type: Option<String>,
    pub applet_id: Option<String>,
    pub key_info: Option<String>,
    pub policy: Option<String>,
}

impl From<TokenFields> for UpdateToken {
    fn from(fields: TokenFields) -> Self {
        UpdateToken {
            user_id: Some(fields.user_id),
            token_type: Some(fields.token_type),
            applet_id: Some(fields.applet_id),
            key_info: Some(fields.key_info),
            policy: Some(fields.policy),
        }
    }
}

/// Token lifecycle service.
///
/// Generic over the record store, revocation gateway and activity log so
/// that the lifecycle has no dependency on the database crate. Cloning is
/// cheap and clones share locks and state.
pub struct TokenService<T, G, A> {
    inner: Arc<Inner<T, G, A>>,
}

impl<T, G, A> Clone for TokenService<T, G, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<T, G, A> {
    tokens: T,
    gateway: G,
    activity: A,
    table: TransitionTable,
    locks: TokenLocks,
}

fn require_token_id(token_id: &str) -> TokenDbResult<&str> {
    if token_id.trim().is_empty() {
        return Err(TokenDbError::invalid_request("token ID is required"));
    }
    Ok(token_id)
}

fn task_failed(operation: TokenOperation, err: tokio::task::JoinError) -> TokenDbError {
    TokenDbError::Internal(format!("{operation} task failed: {err}"))
}

impl<T, G, A> TokenService<T, G, A>
where
    T: TokenRepository + 'static,
    G: RevocationGateway + 'static,
    A: ActivityRepository + 'static,
{
    pub fn new(tokens: T, gateway: G, activity: A, table: TransitionTable) -> Self {
        Self {
            inner: Arc::new(Inner {
                tokens,
                gateway,
                activity,
                table,
                locks: TokenLocks::new(),
            }),
        }
    }

    pub fn from_config(
        tokens: T,
        gateway: G,
        activity: A,
        config: &LifecycleConfig,
    ) -> TokenDbResult<Self> {
        let table = config.transition_table()?;
        if table.is_empty() {
            warn!("No token status transitions are allowed");
        }
        Ok(Self::new(tokens, gateway, activity, table))
    }

    pub fn transition_table(&self) -> &TransitionTable {
        &self.inner.table
    }

    pub async fn get_token(&self, token_id: &str) -> TokenDbResult<TokenRecord> {
        self.inner.tokens.get_by_id(require_token_id(token_id)?).await
    }

    pub async fn find_tokens(
        &self,
        filter: TokenFilter,
        pagination: Pagination,
    ) -> TokenDbResult<PaginatedResult<TokenRecord>> {
        self.inner.tokens.find(filter, pagination).await
    }

    /// Statuses the token may move to next under the configured table.
    pub async fn next_states(&self, token_id: &str) -> TokenDbResult<Vec<TokenStatus>> {
        let record = self.get_token(token_id).await?;
        Ok(self.inner.table.next_states(record.logical_status()))
    }

    /// Register a token. The record always starts `UNINITIALIZED`,
    /// whatever status the caller supplied.
    pub async fn add_token(&self, input: NewToken) -> TokenDbResult<TokenRecord> {
        require_token_id(&input.id)?;
        self.inner.add_token(input).await
    }

    /// Overwrite every descriptive field. Status is untouched; use
    /// [`TokenService::change_status`] to move a token.
    pub async fn replace_token(
        &self,
        token_id: &str,
        fields: TokenFields,
    ) -> TokenDbResult<TokenRecord> {
        self.inner
            .update_token(require_token_id(token_id)?, fields.into(), TokenOperation::Replace)
            .await
    }

    /// Update only the descriptive fields present in `update`.
    pub async fn modify_token(
        &self,
        token_id: &str,
        update: UpdateToken,
    ) -> TokenDbResult<TokenRecord> {
        self.inner
            .update_token(require_token_id(token_id)?, update, TokenOperation::Modify)
            .await
    }

    /// Move a token to `target`, revoking or unrevoking its certificates
    /// as the move requires.
    ///
    /// Runs detached from the caller: dropping the returned future does
    /// not cancel a change that is already in progress, so the gateway
    /// call is never separated from the persist that follows it.
    pub async fn change_status(
        &self,
        token_id: &str,
        target: TokenStatus,
    ) -> TokenDbResult<TokenRecord> {
        let token_id = require_token_id(token_id)?.to_string();
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move { inner.change_status(&token_id, target).await })
            .await
            .map_err(|e| task_failed(TokenOperation::StatusChange, e))?
    }

    /// [`TokenService::change_status`] with the target given by name or
    /// integer code, as it arrives from an administrative request.
    pub async fn change_status_named(
        &self,
        token_id: &str,
        requested: &str,
    ) -> TokenDbResult<TokenRecord> {
        let target = requested.parse::<TokenStatus>()?;
        self.change_status(token_id, target).await
    }

    /// Purge the token's certificates, then delete the record.
    ///
    /// The purge is best-effort: if the gateway fails the record is
    /// still deleted and the failure is logged and recorded.
    pub async fn remove_token(&self, token_id: &str) -> TokenDbResult<()> {
        let token_id = require_token_id(token_id)?.to_string();
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move { inner.remove_token(&token_id).await })
            .await
            .map_err(|e| task_failed(TokenOperation::Remove, e))?
    }
}

impl<T, G, A> Inner<T, G, A>
where
    T: TokenRepository,
    G: RevocationGateway,
    A: ActivityRepository,
{
    async fn add_token(&self, input: NewToken) -> TokenDbResult<TokenRecord> {
        let token_id = input.id.clone();
        let _guard = self.locks.lock(&token_id).await;

        if let Some(requested) = input
            .status
            .as_deref()
            .filter(|status| *status != STATUS_UNINITIALIZED)
        {
            debug!(%token_id, requested, "Ignoring supplied status for new token");
        }

        let result = self
            .tokens
            .create(CreateToken {
                id: input.id,
                user_id: input.user_id.clone(),
                token_type: input.token_type,
                status: STATUS_UNINITIALIZED.into(),
                reason: None,
                applet_id: input.applet_id,
                key_info: input.key_info,
                policy: input.policy,
            })
            .await;

        match &result {
            Ok(record) => {
                info!(%token_id, user_id = ?record.user_id, "Token added");
                self.record_success(record, TokenOperation::Add, "token added".into(), None)
                    .await;
            }
            Err(err) => {
                warn!(%token_id, error = %err, "Failed to add token");
                self.record_failure(&token_id, input.user_id, TokenOperation::Add, err, None)
                    .await;
            }
        }
        result
    }

    async fn update_token(
        &self,
        token_id: &str,
        update: UpdateToken,
        operation: TokenOperation,
    ) -> TokenDbResult<TokenRecord> {
        let _guard = self.locks.lock(token_id).await;

        let result = self.tokens.update(token_id, update).await;

        match &result {
            Ok(record) => {
                info!(token_id, %operation, "Token updated");
                self.record_success(record, operation, "token updated".into(), None)
                    .await;
            }
            Err(err) => {
                warn!(token_id, %operation, error = %err, "Failed to update token");
                let owner = self.owner_of(token_id).await;
                self.record_failure(token_id, owner, operation, err, None)
                    .await;
            }
        }
        result
    }

    async fn change_status(
        &self,
        token_id: &str,
        target: TokenStatus,
    ) -> TokenDbResult<TokenRecord> {
        let _guard = self.locks.lock(token_id).await;

        let (owner, result) = match self.tokens.get_by_id(token_id).await {
            Ok(record) => (
                record.user_id.clone(),
                self.apply_status_change(record, target).await,
            ),
            Err(err) => (None, Err(err)),
        };

        match result {
            Ok((from, record)) => {
                info!(
                    token_id,
                    %from,
                    to = %target,
                    status = %record.status,
                    reason = ?record.reason,
                    "Token status changed"
                );
                let metadata = json!({
                    "from": from,
                    "to": target,
                    "status": record.status,
                    "reason": record.reason,
                });
                self.record_success(
                    &record,
                    TokenOperation::StatusChange,
                    format!("{from} -> {target}"),
                    Some(metadata),
                )
                .await;
                Ok(record)
            }
            Err(err) => {
                warn!(token_id, to = %target, error = %err, "Token status change rejected");
                let metadata = match &err {
                    TokenDbError::IllegalTransition { from, to } => json!({ "from": from, "to": to }),
                    _ => json!({ "to": target }),
                };
                self.record_failure(
                    token_id,
                    owner,
                    TokenOperation::StatusChange,
                    &err,
                    Some(metadata),
                )
                .await;
                Err(err)
            }
        }
    }

    /// Returns the status the token moved from and the updated record.
    async fn apply_status_change(
        &self,
        record: TokenRecord,
        target: TokenStatus,
    ) -> TokenDbResult<(TokenStatus, TokenRecord)> {
        let token_id = record.id.as_str();
        let current = record.logical_status();

        if !self.table.is_allowed(current, target) {
            return Err(TokenDbError::IllegalTransition {
                from: current,
                to: target,
            });
        }

        let change = StatusChange::plan(&record.status, record.reason.as_deref(), target);

        self.apply_certificate_action(token_id, change.action).await?;

        let updated = self
            .tokens
            .set_status(token_id, change.status, change.reason_str())
            .await
            .inspect_err(|err| {
                if change.action != CertificateAction::None {
                    error!(
                        token_id,
                        to = %target,
                        error = %err,
                        "Certificates updated but token status not persisted"
                    );
                }
            })?;

        Ok((current, updated))
    }

    async fn apply_certificate_action(
        &self,
        token_id: &str,
        action: CertificateAction,
    ) -> TokenDbResult<()> {
        match action {
            CertificateAction::None => {}
            CertificateAction::Revoke(reason) => {
                let revoked = self.gateway.revoke_certificates(token_id, reason).await?;
                info!(token_id, %reason, revoked, "Revoked token certificates");
            }
            CertificateAction::Unrevoke => {
                let restored = self.gateway.unrevoke_certificates(token_id).await?;
                info!(token_id, restored, "Unrevoked token certificates");
            }
        }
        Ok(())
    }

    async fn remove_token(&self, token_id: &str) -> TokenDbResult<()> {
        let _guard = self.locks.lock(token_id).await;

        let record = match self.tokens.get_by_id(token_id).await {
            Ok(record) => record,
            Err(err) => {
                self.record_failure(token_id, None, TokenOperation::Remove, &err, None)
                    .await;
                return Err(err);
            }
        };

        let purge = self.gateway.remove_certificates(token_id).await;
        let message = match &purge {
            Ok(removed) => {
                debug!(token_id, removed, "Purged token certificates");
                "token removed".to_string()
            }
            Err(err) => {
                warn!(token_id, error = %err, "Failed to purge token certificates, removing token anyway");
                format!("token removed; certificate purge failed: {err}")
            }
        };

        if let Err(err) = self.tokens.delete(token_id).await {
            warn!(token_id, error = %err, "Failed to remove token");
            self.record_failure(token_id, record.user_id, TokenOperation::Remove, &err, None)
                .await;
            return Err(err);
        }

        info!(token_id, "Token removed");
        let metadata = purge.ok().map(|removed| json!({ "certificates_removed": removed }));
        self.record_success(&record, TokenOperation::Remove, message, metadata)
            .await;
        Ok(())
    }

    /// Owner of a stored token, for failure entries where the operation
    /// itself returned no record.
    async fn owner_of(&self, token_id: &str) -> Option<String> {
        self.tokens
            .get_by_id(token_id)
            .await
            .ok()
            .and_then(|record| record.user_id)
    }

    async fn record_success(
        &self,
        record: &TokenRecord,
        operation: TokenOperation,
        message: String,
        metadata: Option<serde_json::Value>,
    ) {
        self.record(CreateTokenActivity {
            token_id: record.id.clone(),
            user_id: record.user_id.clone(),
            operation,
            outcome: ActivityOutcome::Success,
            message,
            metadata,
        })
        .await;
    }

    async fn record_failure(
        &self,
        token_id: &str,
        user_id: Option<String>,
        operation: TokenOperation,
        err: &TokenDbError,
        metadata: Option<serde_json::Value>,
    ) {
        self.record(CreateTokenActivity {
            token_id: token_id.to_string(),
            user_id,
            operation,
            outcome: ActivityOutcome::Failure,
            message: err.to_string(),
            metadata,
        })
        .await;
    }

    /// Activity is recorded after the fact; failing to record does not
    /// undo or fail the operation.
    async fn record(&self, entry: CreateTokenActivity) {
        let token_id = entry.token_id.clone();
        let operation = entry.operation;
        if let Err(err) = self.activity.append(entry).await {
            warn!(%token_id, %operation, error = %err, "Failed to record token activity");
        }
    }
}
