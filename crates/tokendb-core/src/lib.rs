//! Token database core: domain models, error types and the repository
//! traits the lifecycle service is generic over.

pub mod error;
pub mod models;
pub mod repository;

pub use error::{TokenDbError, TokenDbResult};
pub use models::token::{RevocationReason, TokenRecord, TokenStatus};
