//! Allowed token status transitions.
//!
//! Operators author the allow-list by hand as `<from>:<to>` pairs of
//! [`TokenStatus`] integer codes, e.g. `0:4,4:3,3:4`. Anything not listed
//! is rejected.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use tokendb_core::models::token::TokenStatus;

use crate::error::LifecycleError;

/// Read-only map from a current status to the statuses reachable from it
/// in one step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionTable {
    allowed: HashMap<TokenStatus, BTreeSet<TokenStatus>>,
}

impl TransitionTable {
    /// Parse a `tokendb.allowedTransitions` string.
    ///
    /// Whitespace around entries is ignored, as are empty entries, so a
    /// trailing comma is accepted.
    pub fn parse(config: &str) -> Result<Self, LifecycleError> {
        let mut table = Self::default();

        for entry in config.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (from, to) = entry
                .split_once(':')
                .ok_or_else(|| LifecycleError::MalformedEntry {
                    entry: entry.to_string(),
                })?;
            let from = parse_code(entry, from)?;
            let to = parse_code(entry, to)?;

            if from.is_target_only() {
                return Err(LifecycleError::TargetOnlySource {
                    entry: entry.to_string(),
                    status: from.to_string(),
                });
            }

            table.allow(from, to);
        }

        Ok(table)
    }

    fn allow(&mut self, from: TokenStatus, to: TokenStatus) {
        self.allowed.entry(from).or_default().insert(to);
    }

    /// A source with no entries rejects every destination.
    pub fn is_allowed(&self, from: TokenStatus, to: TokenStatus) -> bool {
        self.allowed
            .get(&from)
            .is_some_and(|targets| targets.contains(&to))
    }

    /// Destinations reachable from `from`, ordered by status code.
    pub fn next_states(&self, from: TokenStatus) -> Vec<TokenStatus> {
        self.allowed
            .get(&from)
            .map(|targets| targets.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

fn parse_code(entry: &str, code: &str) -> Result<TokenStatus, LifecycleError> {
    code.trim()
        .parse::<u8>()
        .ok()
        .and_then(TokenStatus::from_code)
        .ok_or_else(|| LifecycleError::UnknownStatusCode {
            entry: entry.to_string(),
            code: code.trim().to_string(),
        })
}

/// Renders back to the configuration syntax, sorted by code.
impl fmt::Display for TransitionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sources: Vec<_> = self.allowed.keys().copied().collect();
        sources.sort();

        let mut first = true;
        for from in sources {
            for to in &self.allowed[&from] {
                if !first {
                    f.write_str(",")?;
                }
                first = false;
                write!(f, "{}:{}", from.code(), to.code())?;
            }
        }
        Ok(())
    }
}
