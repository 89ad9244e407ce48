use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::StorageConfig;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL for {0}")]
    InvalidDatabaseUrl(&'static str),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Owns the relational and document connection pools.
///
/// Built once at startup from [`StorageConfig`]; handlers reach the pools
/// only through the backends constructed from it.
#[derive(Clone)]
pub struct DatabaseManager {
    relational: PgPool,
    document: PgPool,
}

impl DatabaseManager {
    /// Connect both pools. When no separate document URL is configured the
    /// document collections share the relational pool.
    pub async fn connect(storage: &StorageConfig) -> Result<Self, DatabaseError> {
        let relational_url = storage
            .relational_url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        Self::validate_url(relational_url, "DATABASE_URL")?;

        let relational = Self::pool(storage, relational_url).await?;
        info!(db = %Self::redact(relational_url), "Connected relational store");

        let document = match storage.document_url.as_deref() {
            Some(url) if url != relational_url => {
                Self::validate_url(url, "DOCUMENT_DATABASE_URL")?;
                let pool = Self::pool(storage, url).await?;
                info!(db = %Self::redact(url), "Connected document store");
                pool
            }
            _ => relational.clone(),
        };

        Ok(Self { relational, document })
    }

    async fn pool(storage: &StorageConfig, url: &str) -> Result<PgPool, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(storage.max_connections)
            .acquire_timeout(Duration::from_secs(storage.connection_timeout))
            .connect(url)
            .await?;
        Ok(pool)
    }

    pub fn relational(&self) -> &PgPool {
        &self.relational
    }

    pub fn document(&self) -> &PgPool {
        &self.document
    }

    /// Pings both pools to ensure connectivity
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.relational).await?;
        sqlx::query("SELECT 1").execute(&self.document).await?;
        Ok(())
    }

    /// Close both pools (e.g., on shutdown)
    pub async fn close_all(&self) {
        self.relational.close().await;
        self.document.close().await;
        info!("Closed database pools");
    }

    fn validate_url(raw: &str, name: &'static str) -> Result<(), DatabaseError> {
        let url = url::Url::parse(raw).map_err(|_| DatabaseError::InvalidDatabaseUrl(name))?;
        match url.scheme() {
            "postgres" | "postgresql" => Ok(()),
            _ => Err(DatabaseError::InvalidDatabaseUrl(name)),
        }
    }

    /// Connection string without credentials, for logs.
    fn redact(raw: &str) -> String {
        match url::Url::parse(raw) {
            Ok(mut url) => {
                let _ = url.set_password(None);
                let _ = url.set_username("");
                url.to_string()
            }
            Err(_) => "<invalid url>".to_string(),
        }
    }
}
