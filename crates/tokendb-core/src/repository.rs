//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. The lifecycle service takes
//! implementations as constructor parameters; nothing here is looked up
//! from a global registry.

use crate::error::TokenDbResult;
use crate::models::{
    activity::{CreateTokenActivity, TokenActivity},
    certificate::{CreateTokenCertificate, TokenCertificate},
    token::{CreateToken, RevocationReason, TokenFilter, TokenRecord, UpdateToken},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Token records
// ---------------------------------------------------------------------------

pub trait TokenRepository: Send + Sync {
    /// Fails with `AlreadyExists` if a record with the same ID is stored.
    fn create(&self, input: CreateToken) -> impl Future<Output = TokenDbResult<TokenRecord>> + Send;
    fn get_by_id(&self, id: &str) -> impl Future<Output = TokenDbResult<TokenRecord>> + Send;
    /// Update descriptive fields only.
    fn update(
        &self,
        id: &str,
        input: UpdateToken,
    ) -> impl Future<Output = TokenDbResult<TokenRecord>> + Send;
    /// Overwrite the persisted `(status, reason)` pair.
    fn set_status(
        &self,
        id: &str,
        status: &str,
        reason: Option<&str>,
    ) -> impl Future<Output = TokenDbResult<TokenRecord>> + Send;
    fn delete(&self, id: &str) -> impl Future<Output = TokenDbResult<()>> + Send;
    fn find(
        &self,
        filter: TokenFilter,
        pagination: Pagination,
    ) -> impl Future<Output = TokenDbResult<PaginatedResult<TokenRecord>>> + Send;
}

// ---------------------------------------------------------------------------
// Certificates bound to tokens
// ---------------------------------------------------------------------------

/// Revokes, unrevokes and purges every certificate bound to a token.
///
/// Implementations must be idempotent: revoking an already revoked
/// certificate, or unrevoking one that is not on hold, changes nothing.
/// Each method returns the number of certificates it changed.
pub trait RevocationGateway: Send + Sync {
    fn revoke_certificates(
        &self,
        token_id: &str,
        reason: RevocationReason,
    ) -> impl Future<Output = TokenDbResult<u64>> + Send;
    /// Lift an `onHold` revocation. Certificates revoked for any other
    /// reason stay revoked.
    fn unrevoke_certificates(&self, token_id: &str) -> impl Future<Output = TokenDbResult<u64>> + Send;
    fn remove_certificates(&self, token_id: &str) -> impl Future<Output = TokenDbResult<u64>> + Send;
}

pub trait TokenCertificateRepository: Send + Sync {
    fn create(
        &self,
        input: CreateTokenCertificate,
    ) -> impl Future<Output = TokenDbResult<TokenCertificate>> + Send;
    fn list_by_token(
        &self,
        token_id: &str,
    ) -> impl Future<Output = TokenDbResult<Vec<TokenCertificate>>> + Send;
}

// ---------------------------------------------------------------------------
// Activity (append-only)
// ---------------------------------------------------------------------------

pub trait ActivityRepository: Send + Sync {
    /// Append a new activity entry. No update or delete operations exist.
    fn append(
        &self,
        input: CreateTokenActivity,
    ) -> impl Future<Output = TokenDbResult<TokenActivity>> + Send;
    fn list_by_token(
        &self,
        token_id: &str,
        pagination: Pagination,
    ) -> impl Future<Output = TokenDbResult<PaginatedResult<TokenActivity>>> + Send;
}
