//! SurrealDB repository implementations.

mod activity;
mod certificate;
mod token;

pub use activity::SurrealActivityRepository;
pub use certificate::SurrealCertificateRepository;
pub use token::SurrealTokenRepository;
