//! Lifecycle configuration error types.

use thiserror::Error;
use tokendb_core::error::TokenDbError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("malformed transition entry {entry:?}, expected <from>:<to>")]
    MalformedEntry { entry: String },

    #[error("unknown token status code {code:?} in transition entry {entry:?}")]
    UnknownStatusCode { entry: String, code: String },

    #[error("{status} can only be a transition target, found as source in {entry:?}")]
    TargetOnlySource { entry: String, status: String },
}

impl From<LifecycleError> for TokenDbError {
    fn from(err: LifecycleError) -> Self {
        TokenDbError::Configuration(err.to_string())
    }
}
