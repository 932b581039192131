//! Token lifecycle: the allowed-transitions table, status encoding and
//! the [`TokenService`] state machine that drives certificate revocation.

pub mod config;
pub mod error;
pub mod lock;
pub mod service;
pub mod status;
pub mod transition;

pub use config::LifecycleConfig;
pub use error::LifecycleError;
pub use service::{NewToken, TokenFields, TokenService};
pub use status::{CertificateAction, StatusChange};
pub use transition::TransitionTable;
