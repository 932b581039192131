//! Error types for the token database.

use thiserror::Error;

use crate::models::token::TokenStatus;

#[derive(Debug, Error)]
pub enum TokenDbError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity} with id {id}")]
    AlreadyExists { entity: String, id: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// The requested move is not in the configured allow-list.
    #[error("Illegal token status transition from {from} to {to}")]
    IllegalTransition { from: TokenStatus, to: TokenStatus },

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A collaborator (record store, revocation gateway) failed. The
    /// operation may have been partially applied; retrying is safe.
    #[error("Dependency failure: {0}")]
    Dependency(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TokenDbError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Whether the caller supplied something wrong, as opposed to a
    /// server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::AlreadyExists { .. }
                | Self::InvalidRequest { .. }
                | Self::IllegalTransition { .. }
        )
    }
}

pub type TokenDbResult<T> = Result<T, TokenDbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_transition_names_both_states() {
        let err = TokenDbError::IllegalTransition {
            from: TokenStatus::Active,
            to: TokenStatus::PermLost,
        };
        assert_eq!(
            err.to_string(),
            "Illegal token status transition from ACTIVE to PERM_LOST"
        );
        assert!(err.is_client_error());
    }

    #[test]
    fn dependency_failures_are_server_errors() {
        assert!(!TokenDbError::Dependency("ldap down".into()).is_client_error());
        assert!(!TokenDbError::Internal("boom".into()).is_client_error());
    }
}
