//! Connection to the SurrealDB instance holding token records, their
//! certificates and the activity log.

use serde::Deserialize;
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

/// `[database]` section of the server configuration.
///
/// Every field is optional in the file; missing ones fall back to a
/// local development instance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// `host:port` of the SurrealDB WebSocket endpoint.
    pub url: String,
    pub namespace: String,
    /// Database that owns the `token`, `token_certificate` and
    /// `token_activity` tables.
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "pki".into(),
            database: "tokendb".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

/// Signed-in handle to the token database.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Open the WebSocket connection, sign in as root and select the
    /// token namespace and database. Migrations are not run here.
    pub async fn connect(config: &DbConfig) -> Result<Self, surrealdb::Error> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to token database"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;
        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!("Token database connected");
        Ok(Self { db })
    }

    /// Client shared by the token, certificate and activity repositories.
    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_token_database() {
        let config = DbConfig::default();
        assert_eq!(config.namespace, "pki");
        assert_eq!(config.database, "tokendb");
    }

    #[test]
    fn partial_section_keeps_defaults() {
        let config: DbConfig =
            serde_json::from_str(r#"{"url": "ca-db.internal:8000", "password": "s3cret"}"#)
                .unwrap();
        assert_eq!(config.url, "ca-db.internal:8000");
        assert_eq!(config.password, "s3cret");
        assert_eq!(config.username, "root");
        assert_eq!(config.database, "tokendb");
    }
}
