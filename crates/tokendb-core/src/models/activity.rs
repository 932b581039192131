//! Token activity log model.
//!
//! Every mutating token operation leaves one entry, successful or not.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenOperation {
    Add,
    Replace,
    Modify,
    StatusChange,
    Remove,
}

impl TokenOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenOperation::Add => "add",
            TokenOperation::Replace => "replace",
            TokenOperation::Modify => "modify",
            TokenOperation::StatusChange => "status_change",
            TokenOperation::Remove => "remove",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "add" => Some(TokenOperation::Add),
            "replace" => Some(TokenOperation::Replace),
            "modify" => Some(TokenOperation::Modify),
            "status_change" => Some(TokenOperation::StatusChange),
            "remove" => Some(TokenOperation::Remove),
            _ => None,
        }
    }
}

impl fmt::Display for TokenOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActivityOutcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenActivity {
    pub id: Uuid,
    pub token_id: String,
    pub user_id: Option<String>,
    pub operation: TokenOperation,
    pub outcome: ActivityOutcome,
    pub message: String,
    pub metadata: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTokenActivity {
    pub token_id: String,
    pub user_id: Option<String>,
    pub operation: TokenOperation,
    pub outcome: ActivityOutcome,
    pub message: String,
    pub metadata: Option<serde_json::Value>,
}
