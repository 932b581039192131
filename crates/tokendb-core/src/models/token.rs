//! Token domain model.
//!
//! A token is a physical smart card enrolled in the PKI, keyed by the
//! card's CUID. The persisted record carries a raw `(status, reason)`
//! string pair; the logical [`TokenStatus`] is always derived from it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::TokenDbError;

/// Persisted `status` values.
pub const STATUS_UNINITIALIZED: &str = "uninitialized";
pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_LOST: &str = "lost";
pub const STATUS_TERMINATED: &str = "terminated";

/// Logical token status.
///
/// The discriminants are the integer codes operators write in the
/// allowed-transitions configuration string. They must never change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenStatus {
    Uninitialized = 0,
    Damaged = 1,
    PermLost = 2,
    TempLost = 3,
    Active = 4,
    /// Target-only: a request to move a temporarily lost token to
    /// permanently lost. Persists exactly like [`TokenStatus::PermLost`].
    TempLostPermLost = 5,
    Terminated = 6,
}

impl TokenStatus {
    pub const ALL: [TokenStatus; 7] = [
        TokenStatus::Uninitialized,
        TokenStatus::Damaged,
        TokenStatus::PermLost,
        TokenStatus::TempLost,
        TokenStatus::Active,
        TokenStatus::TempLostPermLost,
        TokenStatus::Terminated,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            TokenStatus::Uninitialized => "UNINITIALIZED",
            TokenStatus::Damaged => "DAMAGED",
            TokenStatus::PermLost => "PERM_LOST",
            TokenStatus::TempLost => "TEMP_LOST",
            TokenStatus::Active => "ACTIVE",
            TokenStatus::TempLostPermLost => "TEMP_LOST_PERM_LOST",
            TokenStatus::Terminated => "TERMINATED",
        }
    }

    /// Whether a persisted record can ever decode to this status.
    pub fn is_target_only(self) -> bool {
        self == TokenStatus::TempLostPermLost
    }
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts either the canonical name (case-insensitive) or the integer code.
impl FromStr for TokenStatus {
    type Err = TokenDbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TokenDbError::invalid_request("token status is required"));
        }
        if let Ok(code) = s.parse::<u8>() {
            return Self::from_code(code).ok_or_else(|| {
                TokenDbError::invalid_request(format!("unknown token status code: {code}"))
            });
        }
        Self::ALL
            .into_iter()
            .find(|status| status.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| TokenDbError::invalid_request(format!("unknown token status: {s}")))
    }
}

/// Revocation reasons shared by token records and the revocation gateway.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RevocationReason {
    #[serde(rename = "keyCompromise")]
    KeyCompromise,
    #[serde(rename = "destroyed")]
    Destroyed,
    #[serde(rename = "onHold")]
    OnHold,
}

impl RevocationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RevocationReason::KeyCompromise => "keyCompromise",
            RevocationReason::Destroyed => "destroyed",
            RevocationReason::OnHold => "onHold",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "keyCompromise" => Some(RevocationReason::KeyCompromise),
            "destroyed" => Some(RevocationReason::Destroyed),
            "onHold" => Some(RevocationReason::OnHold),
            _ => None,
        }
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored token record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenRecord {
    /// Card CUID. Immutable once created.
    pub id: String,
    pub user_id: Option<String>,
    /// Token profile.
    pub token_type: Option<String>,
    /// Raw persisted status.
    pub status: String,
    /// Raw persisted reason; meaningful for `lost` and `terminated` only.
    pub reason: Option<String>,
    pub applet_id: Option<String>,
    pub key_info: Option<String>,
    pub policy: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn logical_status(&self) -> TokenStatus {
        decode_status(&self.status, self.reason.as_deref())
    }

    /// Whether the persisted pair is `("lost", "onHold")`.
    pub fn is_on_hold(&self) -> bool {
        is_on_hold(&self.status, self.reason.as_deref())
    }
}

pub fn is_on_hold(status: &str, reason: Option<&str>) -> bool {
    status == STATUS_LOST && reason == Some(RevocationReason::OnHold.as_str())
}

/// Derive the logical status from a persisted `(status, reason)` pair.
///
/// Unrecognized combinations decode to [`TokenStatus::PermLost`]: a
/// corrupted record is treated as if its card were compromised.
pub fn decode_status(status: &str, reason: Option<&str>) -> TokenStatus {
    match (status, reason.and_then(RevocationReason::parse)) {
        (STATUS_UNINITIALIZED, _) => TokenStatus::Uninitialized,
        (STATUS_ACTIVE, _) => TokenStatus::Active,
        (STATUS_LOST, Some(RevocationReason::KeyCompromise)) => TokenStatus::PermLost,
        (STATUS_LOST, Some(RevocationReason::Destroyed)) => TokenStatus::Damaged,
        (STATUS_LOST, Some(RevocationReason::OnHold)) => TokenStatus::TempLost,
        (STATUS_TERMINATED, _) => TokenStatus::Terminated,
        _ => {
            warn!(status, reason, "unrecognized token status, treating as PERM_LOST");
            TokenStatus::PermLost
        }
    }
}

/// Fields required to store a new token record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateToken {
    pub id: String,
    pub user_id: Option<String>,
    pub token_type: Option<String>,
    pub status: String,
    pub reason: Option<String>,
    pub applet_id: Option<String>,
    pub key_info: Option<String>,
    pub policy: Option<String>,
}

/// Descriptive-field update. Status is never part of it.
///
/// For every field: `Some(Some(val))` = set, `Some(None)` = clear,
/// `None` = no change.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateToken {
    pub user_id: Option<Option<String>>,
    pub token_type: Option<Option<String>>,
    pub applet_id: Option<Option<String>>,
    pub key_info: Option<Option<String>>,
    pub policy: Option<Option<String>>,
}

impl UpdateToken {
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none()
            && self.token_type.is_none()
            && self.applet_id.is_none()
            && self.key_info.is_none()
            && self.policy.is_none()
    }
}

/// Search filter for token listings.
#[derive(Debug, Clone, Default)]
pub struct TokenFilter {
    /// Substring of the token ID.
    pub token_id: Option<String>,
    /// Substring of the owning user ID.
    pub user_id: Option<String>,
    pub token_type: Option<String>,
    /// Raw persisted status.
    pub status: Option<String>,
}
