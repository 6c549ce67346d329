//! MedSync Server: Application entry point.

mod config;

use std::sync::Arc;

use medsync_auth::{CredentialIssuer, DeliveryStatus, SessionIssuer, TracingNotifier};
use medsync_authz::Gateway;
use medsync_core::repository::Repositories;
use medsync_db::{DbManager, SurrealRepositories};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .json()
        .init();

    tracing::info!("Starting MedSync server...");

    let db = DbManager::open(&settings.db_config()).await?;

    let auth_config = settings.auth_config();
    let repos = Arc::new(match &auth_config.pepper {
        Some(pepper) => SurrealRepositories::with_pepper(db.client().clone(), pepper.clone()),
        None => SurrealRepositories::new(db.client().clone()),
    });

    let credentials = CredentialIssuer::new(repos.clone(), TracingNotifier, auth_config.clone());
    if let Some(bootstrap) = &settings.bootstrap {
        match credentials
            .bootstrap_super_admin(&bootstrap.name, &bootstrap.email)
            .await?
        {
            Some(provisioned) => {
                tracing::info!(principal_id = %provisioned.principal.id, "Super-admin created");
                if let DeliveryStatus::Failed { reason } = provisioned.delivery {
                    tracing::warn!(%reason, "Super-admin password could not be delivered");
                }
            }
            None => tracing::debug!("Super-admin already present"),
        }
    }

    let _sessions = SessionIssuer::new(repos.principals().clone(), auth_config);
    let _gateway = Gateway::new(repos, credentials);

    tracing::info!("MedSync server ready");
    tokio::signal::ctrl_c().await?;
    tracing::info!("MedSync server stopped.");
    Ok(())
}
