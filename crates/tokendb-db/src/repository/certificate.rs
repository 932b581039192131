//! SurrealDB implementation of the certificate revocation gateway.
//!
//! Revocation is a conditional bulk `UPDATE`, which makes every gateway
//! call idempotent: a certificate that is already in the requested state
//! simply does not match the `WHERE` clause.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tokendb_core::error::TokenDbResult;
use tokendb_core::models::certificate::{
    CertificateStatus, CreateTokenCertificate, TokenCertificate,
};
use tokendb_core::models::token::RevocationReason;
use tokendb_core::repository::{RevocationGateway, TokenCertificateRepository};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct CertificateRowWithId {
    record_id: String,
    token_id: String,
    serial_number: String,
    subject: String,
    status: String,
    revocation_reason: Option<String>,
    revoked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CertificateRow {
    token_id: String,
    serial_number: String,
    subject: String,
    status: String,
    revocation_reason: Option<String>,
    revoked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

/// Rows touched by a bulk update; only their number matters.
#[derive(Debug, SurrealValue)]
struct TouchedRow {
    #[allow(dead_code)]
    record_id: String,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_status(s: &str) -> Result<CertificateStatus, DbError> {
    match s {
        "Active" => Ok(CertificateStatus::Active),
        "Revoked" => Ok(CertificateStatus::Revoked),
        other => Err(DbError::Corrupt(format!("unknown certificate status: {other}"))),
    }
}

impl CertificateRowWithId {
    fn from_row(record_id: String, row: CertificateRow) -> Self {
        Self {
            record_id,
            token_id: row.token_id,
            serial_number: row.serial_number,
            subject: row.subject,
            status: row.status,
            revocation_reason: row.revocation_reason,
            revoked_at: row.revoked_at,
            created_at: row.created_at,
        }
    }

    fn try_into_certificate(self) -> Result<TokenCertificate, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        let revocation_reason = match self.revocation_reason.as_deref() {
            None => None,
            Some(reason) => Some(RevocationReason::parse(reason).ok_or_else(|| {
                DbError::Corrupt(format!("unknown revocation reason: {reason}"))
            })?),
        };
        Ok(TokenCertificate {
            id,
            token_id: self.token_id,
            serial_number: self.serial_number,
            subject: self.subject,
            status: parse_status(&self.status)?,
            revocation_reason,
            revoked_at: self.revoked_at,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB-backed certificate store and revocation gateway.
#[derive(Clone)]
pub struct SurrealCertificateRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealCertificateRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn touch(&self, query: &str, token_id: &str, reason: Option<&str>) -> Result<u64, DbError> {
        let mut result = self
            .db
            .query(query)
            .bind(("token_id", token_id.to_string()))
            .bind(("reason", reason.map(str::to_string)))
            .await?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<TouchedRow> = result.take(0)?;
        Ok(rows.len() as u64)
    }
}

impl<C: Connection> TokenCertificateRepository for SurrealCertificateRepository<C> {
    async fn create(&self, input: CreateTokenCertificate) -> TokenDbResult<TokenCertificate> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('token_certificate', $id) SET \
                 token_id = $token_id, \
                 serial_number = $serial_number, \
                 subject = $subject, \
                 status = 'Active'",
            )
            .bind(("id", id_str.clone()))
            .bind(("token_id", input.token_id))
            .bind(("serial_number", input.serial_number))
            .bind(("subject", input.subject))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<CertificateRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "token_certificate".into(),
            id: id_str.clone(),
        })?;

        Ok(CertificateRowWithId::from_row(id_str, row).try_into_certificate()?)
    }

    async fn list_by_token(&self, token_id: &str) -> TokenDbResult<Vec<TokenCertificate>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM token_certificate \
                 WHERE token_id = $token_id \
                 ORDER BY serial_number ASC",
            )
            .bind(("token_id", token_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CertificateRowWithId> = result.take(0).map_err(DbError::from)?;
        let certs = rows
            .into_iter()
            .map(|row| row.try_into_certificate())
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(certs)
    }
}

impl<C: Connection> RevocationGateway for SurrealCertificateRepository<C> {
    async fn revoke_certificates(
        &self,
        token_id: &str,
        reason: RevocationReason,
    ) -> TokenDbResult<u64> {
        // A hold only applies to live certificates. A permanent reason also
        // upgrades certificates that are currently on hold.
        let query = match reason {
            RevocationReason::OnHold => {
                "UPDATE token_certificate SET \
                 status = 'Revoked', \
                 revocation_reason = $reason, \
                 revoked_at = time::now() \
                 WHERE token_id = $token_id AND status = 'Active' \
                 RETURN meta::id(id) AS record_id"
            }
            RevocationReason::KeyCompromise | RevocationReason::Destroyed => {
                "UPDATE token_certificate SET \
                 status = 'Revoked', \
                 revocation_reason = $reason, \
                 revoked_at = time::now() \
                 WHERE token_id = $token_id \
                 AND (status = 'Active' OR revocation_reason = 'onHold') \
                 RETURN meta::id(id) AS record_id"
            }
        };

        let revoked = self.touch(query, token_id, Some(reason.as_str())).await?;
        debug!(token_id, %reason, revoked, "Revoked token certificates");
        Ok(revoked)
    }

    async fn unrevoke_certificates(&self, token_id: &str) -> TokenDbResult<u64> {
        let restored = self
            .touch(
                "UPDATE token_certificate SET \
                 status = 'Active', \
                 revocation_reason = NONE, \
                 revoked_at = NONE \
                 WHERE token_id = $token_id \
                 AND status = 'Revoked' AND revocation_reason = 'onHold' \
                 RETURN meta::id(id) AS record_id",
                token_id,
                None,
            )
            .await?;
        debug!(token_id, restored, "Unrevoked token certificates");
        Ok(restored)
    }

    async fn remove_certificates(&self, token_id: &str) -> TokenDbResult<u64> {
        // Count first, then delete.
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM token_certificate \
                 WHERE token_id = $token_id GROUP ALL",
            )
            .query("DELETE token_certificate WHERE token_id = $token_id")
            .bind(("token_id", token_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let removed = count_rows.first().map(|r| r.total).unwrap_or(0);
        debug!(token_id, removed, "Removed token certificates");
        Ok(removed)
    }
}
