//! Token database server: wires the lifecycle service to SurrealDB.

mod config;

use anyhow::Context;
use tokendb_db::repository::{
    SurrealActivityRepository, SurrealCertificateRepository, SurrealTokenRepository,
};
use tokendb_db::{DbManager, run_migrations};
use tokendb_lifecycle::TokenService;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .init();

    tracing::info!("Starting token database server...");

    let config = ServerConfig::load()?;

    let db = DbManager::connect(&config.database)
        .await
        .context("Failed to connect to SurrealDB")?;
    run_migrations(db.client())
        .await
        .context("Failed to run database migrations")?;

    let client = db.client().clone();
    let service = TokenService::from_config(
        SurrealTokenRepository::new(client.clone()),
        SurrealCertificateRepository::new(client.clone()),
        SurrealActivityRepository::new(client),
        &config.tokendb,
    )
    .context("Invalid tokendb configuration")?;

    tracing::info!(
        allowed_transitions = %service.transition_table(),
        "Token lifecycle service ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    tracing::info!("Token database server stopped.");
    Ok(())
}
