//! Connection to the SurrealDB server that holds MedSync's hospitals,
//! accounts and clinical records.
//!
//! The server builds a [`DbConfig`] from the `MEDSYNC__DATABASE__*`
//! settings and calls [`DbManager::open`], which connects and brings the
//! schema up to date before any store is handed out. Tests skip this and
//! run [`run_migrations`] against an in-memory engine instead.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::schema::run_migrations;

/// Where the MedSync records live.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket address of the SurrealDB server, e.g. `127.0.0.1:8000`.
    pub url: String,
    /// One namespace per deployment. All hospitals share it; rows carry
    /// their hospital in `tenant_id`.
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    /// A local development server with root credentials.
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "medsync".into(),
            database: "records".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

/// Handle on the records database. Cloning shares the connection.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Sign in as root and select the records database. The schema is left
    /// as found; see [`DbManager::open`].
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to records database"
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

        Ok(Self { db })
    }

    /// Connect and apply pending migrations. Stores must not be built on a
    /// connection that skipped this step: the unique email index and the
    /// status assertions live in the schema.
    pub async fn open(config: &DbConfig) -> Result<Self, DbError> {
        let manager = Self::connect(config).await?;
        run_migrations(&manager.db).await?;
        info!(database = %config.database, "Records database ready");
        Ok(manager)
    }

    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}
