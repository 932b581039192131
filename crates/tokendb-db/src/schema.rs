//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode. Token records are keyed by
//! the card CUID; certificate and activity rows by UUID strings. The raw
//! token `status`/`reason` pair is deliberately left unconstrained so
//! that a corrupted record still loads and decodes to its fail-safe
//! logical status.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "token_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Tokens (keyed by CUID)
-- =======================================================================
DEFINE TABLE token SCHEMAFULL;
DEFINE FIELD user_id ON TABLE token TYPE option<string>;
DEFINE FIELD token_type ON TABLE token TYPE option<string>;
DEFINE FIELD status ON TABLE token TYPE string;
DEFINE FIELD reason ON TABLE token TYPE option<string>;
DEFINE FIELD applet_id ON TABLE token TYPE option<string>;
DEFINE FIELD key_info ON TABLE token TYPE option<string>;
DEFINE FIELD policy ON TABLE token TYPE option<string>;
DEFINE FIELD created_at ON TABLE token TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE token TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_token_user ON TABLE token COLUMNS user_id;
DEFINE INDEX idx_token_status ON TABLE token COLUMNS status;

-- =======================================================================
-- Certificates bound to tokens
-- =======================================================================
DEFINE TABLE token_certificate SCHEMAFULL;
DEFINE FIELD token_id ON TABLE token_certificate TYPE string;
DEFINE FIELD serial_number ON TABLE token_certificate TYPE string;
DEFINE FIELD subject ON TABLE token_certificate TYPE string;
DEFINE FIELD status ON TABLE token_certificate TYPE string \
    ASSERT $value IN ['Active', 'Revoked'];
DEFINE FIELD revocation_reason ON TABLE token_certificate \
    TYPE option<string>;
DEFINE FIELD revoked_at ON TABLE token_certificate \
    TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE token_certificate TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_token_cert_serial ON TABLE token_certificate \
    COLUMNS serial_number UNIQUE;
DEFINE INDEX idx_token_cert_token ON TABLE token_certificate \
    COLUMNS token_id;

-- =======================================================================
-- Token activity (append-only)
-- =======================================================================
DEFINE TABLE token_activity SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD token_id ON TABLE token_activity TYPE string;
DEFINE FIELD user_id ON TABLE token_activity TYPE option<string>;
DEFINE FIELD operation ON TABLE token_activity TYPE string \
    ASSERT $value IN ['add', 'replace', 'modify', 'status_change', \
    'remove'];
DEFINE FIELD outcome ON TABLE token_activity TYPE string \
    ASSERT $value IN ['Success', 'Failure'];
DEFINE FIELD message ON TABLE token_activity TYPE string;
DEFINE FIELD metadata ON TABLE token_activity TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD timestamp ON TABLE token_activity TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_activity_token_time ON TABLE token_activity \
    COLUMNS token_id, timestamp;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS
        .iter()
        .filter(|m| m.version > current_version)
    {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
