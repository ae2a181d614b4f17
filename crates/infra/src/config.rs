//! Layered application settings.
//!
//! Precedence, lowest to highest:
//! 1. compiled defaults
//! 2. `config/default.toml` (optional)
//! 3. `config/local.toml` (optional)
//! 4. environment variables prefixed `FACTHA__`, nested with `__`
//!    (e.g. `FACTHA__AUTH__JWT_SECRET`)

use std::path::{Path, PathBuf};

use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;

use factha_observability::LogFormat;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body (multipart uploads included).
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Postgres connection string; unset selects the in-memory repositories.
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub token_ttl_secs: i64,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Gcs,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket: String,
    /// Public URLs are `{public_base_url}/{bucket}/{key}`.
    pub public_base_url: String,
    /// Static OAuth token for GCS; takes precedence over `credentials_file`.
    pub access_token: Option<String>,
    /// Service-account JSON key; with neither set, ask the metadata server.
    pub credentials_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ClassifierConfig {
    pub model_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Load settings from `./config` and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let dir = std::env::current_dir()
            .map_err(|e| ConfigError::Message(format!("failed to get current directory: {e}")))?
            .join("config");
        Self::load_from(&dir, Environment::with_prefix("FACTHA"))
    }

    /// Load settings from `dir` and the given environment source.
    pub fn load_from(dir: &Path, env: Environment) -> Result<Self, ConfigError> {
        let default_file = dir.join("default");
        let local_file = dir.join("local");

        let settings = Self::defaults()?
            .add_source(File::with_name(&default_file.to_string_lossy()).required(false))
            .add_source(File::with_name(&local_file.to_string_lossy()).required(false))
            .add_source(env.prefix_separator("__").separator("__").try_parsing(true))
            .build()?
            .try_deserialize::<Settings>()?;

        settings.validate()?;
        Ok(settings)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.max_upload_bytes", 5 * 1024 * 1024)?
            .set_default("database.max_connections", 5)?
            .set_default("auth.token_ttl_secs", 3600)?
            .set_default("auth.bcrypt_cost", 10)?
            .set_default("storage.backend", "memory")?
            .set_default("storage.bucket", "factha-bucket")?
            .set_default("storage.public_base_url", "https://storage.googleapis.com")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("server.port must not be 0".to_string()));
        }

        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Message(
                "server.max_upload_bytes must be greater than 0".to_string(),
            ));
        }

        if self.auth.token_ttl_secs <= 0 {
            return Err(ConfigError::Message(format!(
                "auth.token_ttl_secs must be positive, got: {}",
                self.auth.token_ttl_secs
            )));
        }

        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(ConfigError::Message(format!(
                "auth.bcrypt_cost must be between 4 and 31, got: {}",
                self.auth.bcrypt_cost
            )));
        }

        if self.storage.bucket.trim().is_empty() {
            return Err(ConfigError::Message("storage.bucket must not be empty".to_string()));
        }

        match self.logging.level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
            _ => Err(ConfigError::Message(format!(
                "invalid logging level: {}. Must be one of: error, warn, info, debug, trace",
                self.logging.level
            ))),
        }
    }
}
