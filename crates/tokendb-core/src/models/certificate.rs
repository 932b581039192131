//! Certificates bound to a token.
//!
//! These records belong to the revocation gateway: the token lifecycle
//! never edits them directly, it asks the gateway to revoke, unrevoke
//! or purge every certificate issued to a given token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::token::RevocationReason;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CertificateStatus {
    Active,
    Revoked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCertificate {
    pub id: Uuid,
    /// CUID of the token the certificate was enrolled onto.
    pub token_id: String,
    pub serial_number: String,
    /// Certificate subject (e.g., `CN=alice,OU=smartcards`).
    pub subject: String,
    pub status: CertificateStatus,
    /// Set while revoked. `OnHold` is the only reason that can be lifted.
    pub revocation_reason: Option<RevocationReason>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TokenCertificate {
    pub fn is_on_hold(&self) -> bool {
        self.status == CertificateStatus::Revoked
            && self.revocation_reason == Some(RevocationReason::OnHold)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTokenCertificate {
    pub token_id: String,
    pub serial_number: String,
    pub subject: String,
}
