use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Secret used when no `JWT_SECRET` is configured outside production.
const DEV_JWT_SECRET: &str = "dev-secret-no-usar-en-produccion";

/// Upper bound for `JWT_EXPIRES_IN_HOURS`: one year.
pub const MAX_JWT_EXPIRY_HOURS: u64 = 24 * 366;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

/// Where records live. `Memory` keeps everything in-process (tests, demos).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageMode {
    Postgres,
    Memory,
}

/// Which set of connection URLs to use (`DB_ENV`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DbEnv {
    Local,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub mode: StorageMode,
    pub db_env: DbEnv,
    /// Relational store (users, catalogs)
    pub relational_url: Option<String>,
    pub relational_schema: String,
    /// Document store (complaints). Falls back to the relational URL.
    pub document_url: Option<String>,
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub default_page_size: u64,
    pub max_page_size: u64,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()?;

        config.validate()?;
        Ok(config)
    }

    fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        // Server
        if let Some(port) = env::var("PORT").ok().or_else(|| env::var("TRANSITO_API_PORT").ok()) {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "PORT", value: port })?;
        }

        // Storage
        if let Ok(v) = env::var("STORAGE_MODE") {
            self.storage.mode = match v.to_ascii_lowercase().as_str() {
                "postgres" | "pg" => StorageMode::Postgres,
                "memory" | "mem" => StorageMode::Memory,
                _ => return Err(ConfigError::Invalid { name: "STORAGE_MODE", value: v }),
            };
        }
        if let Ok(v) = env::var("DB_ENV") {
            self.storage.db_env = match v.to_ascii_lowercase().as_str() {
                "remote" => DbEnv::Remote,
                _ => DbEnv::Local,
            };
        }
        self.storage.relational_url = match self.storage.db_env {
            DbEnv::Remote => env::var("DATABASE_REMOTE_URL").ok(),
            DbEnv::Local => env::var("DATABASE_LOCAL_URL").ok(),
        }
        .or_else(|| env::var("DATABASE_URL").ok());
        self.storage.document_url = match self.storage.db_env {
            DbEnv::Remote => env::var("DOCUMENT_REMOTE_URL").ok(),
            DbEnv::Local => env::var("DOCUMENT_LOCAL_URL").ok(),
        }
        .or_else(|| env::var("DOCUMENT_DATABASE_URL").ok());
        if let Ok(v) = env::var("DATABASE_SCHEMA") {
            self.storage.relational_schema = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.storage.max_connections = v.parse().unwrap_or(self.storage.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.storage.connection_timeout = v.parse().unwrap_or(self.storage.connection_timeout);
        }

        // API
        if let Ok(v) = env::var("API_DEFAULT_PAGE_SIZE") {
            self.api.default_page_size = v.parse().unwrap_or(self.api.default_page_size);
        }
        if let Ok(v) = env::var("API_MAX_PAGE_SIZE") {
            self.api.max_page_size = v.parse().unwrap_or(self.api.max_page_size);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        // Security
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRES_IN_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        if self.storage.mode == StorageMode::Postgres && self.storage.relational_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        if self.api.default_page_size == 0 || self.api.max_page_size == 0 {
            return Err(ConfigError::Invalid {
                name: "API_DEFAULT_PAGE_SIZE",
                value: self.api.default_page_size.to_string(),
            });
        }
        if !(1..=MAX_JWT_EXPIRY_HOURS).contains(&self.security.jwt_expiry_hours) {
            return Err(ConfigError::Invalid {
                name: "JWT_EXPIRES_IN_HOURS",
                value: self.security.jwt_expiry_hours.to_string(),
            });
        }
        Ok(())
    }

    /// Document store URL, defaulting to the relational database.
    pub fn document_url(&self) -> Option<&str> {
        self.storage
            .document_url
            .as_deref()
            .or(self.storage.relational_url.as_deref())
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Development defaults with in-memory storage; used by tests and `--memory` runs.
    pub fn in_memory() -> Self {
        let mut config = Self::development();
        config.storage.mode = StorageMode::Memory;
        config
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 3000 },
            storage: StorageConfig {
                mode: StorageMode::Postgres,
                db_env: DbEnv::Local,
                relational_url: None,
                relational_schema: "public".to_string(),
                document_url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                default_page_size: 50,
                max_page_size: 1000,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                jwt_secret: DEV_JWT_SECRET.to_string(),
                jwt_expiry_hours: 2,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig { port: 3000 },
            storage: StorageConfig {
                mode: StorageMode::Postgres,
                db_env: DbEnv::Remote,
                relational_url: None,
                relational_schema: "public".to_string(),
                document_url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                default_page_size: 50,
                max_page_size: 500,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                jwt_secret: DEV_JWT_SECRET.to_string(),
                jwt_expiry_hours: 2,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig { port: 8080 },
            storage: StorageConfig {
                mode: StorageMode::Postgres,
                db_env: DbEnv::Remote,
                relational_url: None,
                relational_schema: "public".to_string(),
                document_url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                default_page_size: 50,
                max_page_size: 100,
                enable_request_logging: false,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                // must come from JWT_SECRET
                jwt_secret: String::new(),
                jwt_expiry_hours: 2,
            },
        }
    }
}
