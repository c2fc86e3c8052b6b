use anyhow::Result;
use config::{Config, ConfigError, Environment};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::schemas::AppState;
use common::TokenService;

/// Runtime settings, read from the environment (and `.env`) on top of defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Port the HTTP server listens on
    pub port: u16,
    /// Public base domain used to build upload URLs, e.g. "http://localhost"
    pub domain: String,
    /// Database connection string
    pub database_url: String,
    /// Secret used to sign bearer tokens
    pub jwt_secret: String,
    /// Token lifetime in hours
    pub jwt_expiration_hours: i64,
    /// Directory uploaded images are written to and served from
    pub upload_dir: String,
    pub db_connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Settings {
    /// Load settings from `.env`, the process environment and the defaults below.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Config::builder()
            .set_default("port", 5000)?
            .set_default("domain", "http://localhost")?
            .set_default("database_url", "sqlite://restorust.db?mode=rwc")?
            .set_default("jwt_secret", "your_jwt_secret_key")?
            .set_default("jwt_expiration_hours", 24)?
            .set_default("upload_dir", "public/uploads")?
            .set_default("db_connect_timeout_secs", 8)?
            .set_default("request_timeout_secs", 30)?
            .add_source(Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    /// Absolute URL under which `path` is reachable from outside.
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}:{}/{}",
            self.domain.trim_end_matches('/'),
            self.port,
            path.trim_start_matches('/')
        )
    }
}

/// Connect to the database with explicit connect/acquire timeouts
pub async fn connect_database(settings: &Settings) -> Result<DatabaseConnection> {
    let timeout = Duration::from_secs(settings.db_connect_timeout_secs);
    let mut options = ConnectOptions::new(settings.database_url.clone());
    options
        .connect_timeout(timeout)
        .acquire_timeout(timeout)
        .sqlx_logging(false);

    tracing::info!("Connecting to database: {}", settings.database_url);
    Ok(Database::connect(options).await?)
}

pub fn build_app_state(db: DatabaseConnection, settings: Settings) -> AppState {
    let tokens = TokenService::new(&settings.jwt_secret, settings.jwt_expiration_hours);
    AppState {
        db,
        tokens,
        settings: Arc::new(settings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Settings {
        Settings {
            port: 5000,
            domain: "http://localhost/".to_string(),
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "secret".to_string(),
            jwt_expiration_hours: 24,
            upload_dir: "public/uploads".to_string(),
            db_connect_timeout_secs: 8,
            request_timeout_secs: 30,
        }
    }

    #[test]
    fn test_public_url_joins_cleanly() {
        let settings = sample();
        assert_eq!(
            settings.public_url("/uploads/image.png"),
            "http://localhost:5000/uploads/image.png"
        );
        assert_eq!(settings.bind_address(), "0.0.0.0:5000");
    }
}
