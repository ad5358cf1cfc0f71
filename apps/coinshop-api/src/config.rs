//! Coinshop API configuration module.
//!
//! ## Sources (later wins)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Built-in defaults                                                   │
//! │  2. TOML file  (--config-file <path> or COINSHOP_CONFIG_FILE)           │
//! │  3. Environment COINSHOP__<SECTION>__<KEY>                              │
//! │       e.g. COINSHOP__HTTP__PORT=9000                                    │
//! │            COINSHOP__AUTH__JWT_SECRET=...                               │
//! │            COINSHOP__DATABASE__OPERATION_TIMEOUT_MS=2000                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::auth::SessionIssuer;
use crate::error::AuthError;
use crate::password::CredentialHasher;
use coinshop_db::DbConfig;

/// Signing secret used when none is configured. Only fit for development.
pub const DEV_JWT_SECRET: &str = "coinshop-dev-secret-change-in-production";

/// Coinshop API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub log_format: LogFormat,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl HttpConfig {
    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// SQLite pool settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    #[serde(default)]
    pub operation_timeout_ms: Option<u64>,
}

impl DatabaseConfig {
    /// Builds the pool configuration.
    pub fn to_db_config(&self) -> DbConfig {
        DbConfig::new(&self.path)
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
            .idle_timeout(Some(Duration::from_secs(self.idle_timeout_secs)))
            .max_lifetime(Some(Duration::from_secs(self.max_lifetime_secs)))
            .operation_timeout(self.operation_timeout_ms.map(Duration::from_millis))
    }
}

/// Session and password settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default)]
    pub token_ttl_secs: Option<i64>,
    pub password_memory_kib: u32,
    pub password_iterations: u32,
    pub password_parallelism: u32,
}

impl AuthConfig {
    /// True when the built-in development secret is in use.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    /// Builds the session issuer.
    pub fn session_issuer(&self) -> SessionIssuer {
        SessionIssuer::new(&self.jwt_secret, self.token_ttl_secs)
    }

    /// Builds the password hasher.
    pub fn credential_hasher(&self) -> Result<CredentialHasher, AuthError> {
        CredentialHasher::new(
            self.password_memory_kib,
            self.password_iterations,
            self.password_parallelism,
        )
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl AppConfig {
    /// Loads configuration from defaults, an optional file and the environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("http.host", "0.0.0.0")?
            .set_default("http.port", 8080)?
            .set_default("database.path", "coinshop.db")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.acquire_timeout_secs", 5)?
            .set_default("database.idle_timeout_secs", 600)?
            .set_default("database.max_lifetime_secs", 1800)?
            .set_default("auth.jwt_secret", DEV_JWT_SECRET)?
            .set_default("auth.password_memory_kib", 19456)?
            .set_default("auth.password_iterations", 2)?
            .set_default("auth.password_parallelism", 1)?
            .set_default("log_format", "pretty")?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: AppConfig = builder
            .add_source(
                Environment::with_prefix("COINSHOP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would fail later at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("auth.jwt_secret".to_string()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "database.max_connections must be at least 1".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::InvalidValue(
                "database.min_connections exceeds max_connections".to_string(),
            ));
        }

        if matches!(self.auth.token_ttl_secs, Some(ttl) if ttl <= 0) {
            return Err(ConfigError::InvalidValue(
                "auth.token_ttl_secs must be positive".to_string(),
            ));
        }

        if self.auth.password_memory_kib == 0
            || self.auth.password_iterations == 0
            || self.auth.password_parallelism == 0
        {
            return Err(ConfigError::InvalidValue(
                "auth.password_* cost parameters must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::load(None).unwrap();

        assert_eq!(config.http.port, 8080);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.database.operation_timeout_ms, None);
        assert_eq!(config.auth.token_ttl_secs, None);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("coinshop-config-{}.toml", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "log_format = \"json\"\n\n[http]\nport = 9090\n\n[auth]\njwt_secret = \"s3cret\"\ntoken_ttl_secs = 3600\n\n[database]\noperation_timeout_ms = 1500"
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.http.port, 9090);
        assert_eq!(config.http.host, "0.0.0.0");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.auth.token_ttl_secs, Some(3600));
        assert!(!config.auth.uses_dev_secret());
        assert_eq!(
            config.database.to_db_config().operation_timeout,
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/coinshop.toml")));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::load(None).unwrap();
        assert!(config.validate().is_ok());

        config.auth.jwt_secret = " ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::MissingRequired(_))));

        config.auth.jwt_secret = "s3cret".to_string();
        config.database.max_connections = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));

        config.database.max_connections = 10;
        config.auth.password_iterations = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }
}
