//! Token lifecycle configuration.

use serde::Deserialize;

use crate::error::LifecycleError;
use crate::transition::TransitionTable;

/// Allow-list used when the operator configures none.
///
/// UNINITIALIZED -> ACTIVE, TERMINATED; DAMAGED, PERM_LOST -> TERMINATED;
/// TEMP_LOST -> ACTIVE, TEMP_LOST_PERM_LOST, TERMINATED;
/// ACTIVE -> DAMAGED, PERM_LOST, TEMP_LOST, TERMINATED.
pub const DEFAULT_ALLOWED_TRANSITIONS: &str = "0:4,0:6,1:6,2:6,3:4,3:5,3:6,4:1,4:2,4:3,4:6";

/// Configuration for the token lifecycle service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// `tokendb.allowedTransitions`: comma-separated `<from>:<to>` pairs
    /// of token status codes.
    #[serde(alias = "allowedTransitions")]
    pub allowed_transitions: String,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            allowed_transitions: DEFAULT_ALLOWED_TRANSITIONS.into(),
        }
    }
}

impl LifecycleConfig {
    pub fn transition_table(&self) -> Result<TransitionTable, LifecycleError> {
        TransitionTable::parse(&self.allowed_transitions)
    }
}
