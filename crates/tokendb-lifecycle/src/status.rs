//! Encoding a requested logical status into what gets persisted and
//! what the revocation gateway must do.

use tokendb_core::models::token::{
    RevocationReason, STATUS_ACTIVE, STATUS_LOST, STATUS_TERMINATED, STATUS_UNINITIALIZED,
    TokenStatus, is_on_hold,
};

/// Side effect on the certificates bound to a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateAction {
    None,
    Revoke(RevocationReason),
    Unrevoke,
}

/// The persisted `(status, reason)` pair and gateway action for one
/// status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub status: &'static str,
    pub reason: Option<RevocationReason>,
    pub action: CertificateAction,
}

impl StatusChange {
    /// Plan the move to `target` from the record's current persisted pair.
    ///
    /// `ACTIVE` and `TERMINATED` depend on whether the token was on hold,
    /// so the previous pair must be read before anything is overwritten.
    pub fn plan(prev_status: &str, prev_reason: Option<&str>, target: TokenStatus) -> Self {
        let was_on_hold = is_on_hold(prev_status, prev_reason);

        match target {
            TokenStatus::Uninitialized => Self::persist(STATUS_UNINITIALIZED, None),
            TokenStatus::Active => Self {
                status: STATUS_ACTIVE,
                reason: None,
                action: if was_on_hold {
                    CertificateAction::Unrevoke
                } else {
                    CertificateAction::None
                },
            },
            TokenStatus::PermLost | TokenStatus::TempLostPermLost => {
                Self::revoke(STATUS_LOST, RevocationReason::KeyCompromise)
            }
            TokenStatus::Damaged => Self::revoke(STATUS_LOST, RevocationReason::Destroyed),
            TokenStatus::TempLost => Self::revoke(STATUS_LOST, RevocationReason::OnHold),
            TokenStatus::Terminated => {
                let reason = if was_on_hold {
                    RevocationReason::OnHold
                } else {
                    RevocationReason::KeyCompromise
                };
                Self::revoke(STATUS_TERMINATED, reason)
            }
        }
    }

    fn persist(status: &'static str, reason: Option<RevocationReason>) -> Self {
        Self {
            status,
            reason,
            action: CertificateAction::None,
        }
    }

    fn revoke(status: &'static str, reason: RevocationReason) -> Self {
        Self {
            status,
            reason: Some(reason),
            action: CertificateAction::Revoke(reason),
        }
    }

    pub fn reason_str(&self) -> Option<&'static str> {
        self.reason.map(RevocationReason::as_str)
    }
}
