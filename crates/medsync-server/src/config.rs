//! Server settings.
//!
//! Read from `MEDSYNC__`-prefixed environment variables with `__` as the
//! section separator, e.g. `MEDSYNC__DATABASE__URL` or
//! `MEDSYNC__AUTH__SIGNING_SECRET`.

use medsync_auth::AuthConfig;
use medsync_db::DbConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub database: DatabaseSettings,

    pub auth: AuthSettings,

    /// First super-admin, created once on an empty store.
    pub bootstrap: Option<BootstrapSettings>,

    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_url")]
    pub url: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_db_user")]
    pub username: String,
    #[serde(default = "default_db_user")]
    pub password: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            namespace: default_namespace(),
            database: default_database(),
            username: default_db_user(),
            password: default_db_user(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub signing_secret: String,
    pub pepper: Option<String>,
    #[serde(default = "default_session_lifetime")]
    pub session_lifetime_secs: u64,
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapSettings {
    pub name: String,
    pub email: String,
}

fn default_log_filter() -> String {
    "medsync=info".into()
}

fn default_db_url() -> String {
    DbConfig::default().url
}

fn default_namespace() -> String {
    DbConfig::default().namespace
}

fn default_database() -> String {
    DbConfig::default().database
}

fn default_db_user() -> String {
    "root".into()
}

fn default_session_lifetime() -> u64 {
    AuthConfig::default().session_lifetime_secs
}

fn default_min_password_length() -> usize {
    AuthConfig::default().min_password_length
}

impl Settings {
    /// Load from the environment.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("MEDSYNC").separator("__"))
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        if settings.auth.signing_secret.len() < 32 {
            anyhow::bail!("MEDSYNC__AUTH__SIGNING_SECRET must be at least 32 bytes");
        }
        Ok(settings)
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            url: self.database.url.clone(),
            namespace: self.database.namespace.clone(),
            database: self.database.database.clone(),
            username: self.database.username.clone(),
            password: self.database.password.clone(),
        }
    }

    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            signing_secret: self.auth.signing_secret.clone(),
            session_lifetime_secs: self.auth.session_lifetime_secs,
            pepper: self.auth.pepper.clone(),
            min_password_length: self.auth.min_password_length,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_config_keeps_library_defaults() {
        let settings = Settings {
            database: DatabaseSettings::default(),
            auth: AuthSettings {
                signing_secret: "x".repeat(32),
                pepper: Some("pepper".into()),
                session_lifetime_secs: 3600,
                min_password_length: 14,
            },
            bootstrap: None,
            log_filter: default_log_filter(),
        };

        let auth = settings.auth_config();
        assert_eq!(auth.session_lifetime_secs, 3600);
        assert_eq!(auth.min_password_length, 14);
        assert_eq!(auth.jwt_issuer, "medsync");
        assert_eq!(auth.pepper.as_deref(), Some("pepper"));

        let db = settings.db_config();
        assert_eq!(db.namespace, "medsync");
        assert_eq!(db.database, "records");
    }
}
