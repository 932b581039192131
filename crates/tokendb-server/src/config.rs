//! Server configuration, loaded from a TOML file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokendb_db::DbConfig;
use tokendb_lifecycle::LifecycleConfig;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "TOKENDB_CONFIG";
/// Environment variable overriding `tokendb.allowed_transitions`.
pub const ALLOWED_TRANSITIONS_ENV: &str = "TOKENDB_ALLOWED_TRANSITIONS";
/// File read when `TOKENDB_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "tokendb.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub database: DbConfig,
    pub tokendb: LifecycleConfig,
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let config_str =
            fs::read_to_string(path).context(format!("Failed to read config file: {}", path))?;
        Self::from_toml(&config_str)
    }

    pub fn from_toml(config_str: &str) -> Result<Self> {
        toml::from_str(config_str).context("Failed to parse config file")
    }

    /// Load from `$TOKENDB_CONFIG`, else `tokendb.toml` if present, else
    /// defaults; then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(DEFAULT_CONFIG_PATH)?
            }
            Err(_) => {
                tracing::info!("No configuration file found, using defaults");
                Self::default()
            }
        };
        config.apply_overrides(std::env::var(ALLOWED_TRANSITIONS_ENV).ok());
        Ok(config)
    }

    pub fn apply_overrides(&mut self, allowed_transitions: Option<String>) {
        if let Some(allowed) = allowed_transitions {
            self.tokendb.allowed_transitions = allowed;
        }
    }
}
