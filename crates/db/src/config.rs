//! Connection parameters.
//!
//! Values come from a JSON file shaped `{ "database": { ... } }` and are then
//! overridden field-by-field by `DB_*` environment variables.

use std::path::Path;

use serde::Deserialize;
use sqlx::mysql::{MySqlConnectOptions, MySqlSslMode};
use thiserror::Error;

pub const ENV_HOST: &str = "DB_HOST";
pub const ENV_PORT: &str = "DB_PORT";
pub const ENV_USER: &str = "DB_USER";
pub const ENV_PASSWORD: &str = "DB_PASSWORD";
pub const ENV_NAME: &str = "DB_NAME";
pub const ENV_SSL_MODE: &str = "DB_SSL_MODE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid port '{0}'")]
    InvalidPort(String),

    #[error("invalid ssl mode '{0}'")]
    InvalidSslMode(String),
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    database: DatabaseConfig,
}

/// Everything needed to reach the MySQL server and the target schema.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
    /// One of `disabled`, `preferred`, `required`, `verify_ca`, `verify_identity`.
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_ssl_mode() -> String {
    "preferred".to_string()
}

fn default_max_connections() -> u32 {
    10
}

impl DatabaseConfig {
    /// Read the config file at `path` and apply process environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_json_str(&raw)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse the `database` section of a JSON config document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(raw)?;
        Ok(file.database)
    }

    /// Override fields with values returned by `lookup`.
    ///
    /// Unset and empty variables leave the file value in place.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(host) = get(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = get(ENV_PORT) {
            self.port = port.parse().map_err(|_| ConfigError::InvalidPort(port))?;
        }
        if let Some(user) = get(ENV_USER) {
            self.user = user;
        }
        if let Some(password) = get(ENV_PASSWORD) {
            self.password = password;
        }
        if let Some(database) = get(ENV_NAME) {
            self.database = database;
        }
        if let Some(mode) = get(ENV_SSL_MODE) {
            self.ssl_mode = mode;
        }
        self.parsed_ssl_mode()?;
        Ok(())
    }

    fn parsed_ssl_mode(&self) -> Result<MySqlSslMode, ConfigError> {
        self.ssl_mode
            .parse()
            .map_err(|_| ConfigError::InvalidSslMode(self.ssl_mode.clone()))
    }

    /// Options for a server-level connection with no schema selected.
    pub fn server_options(&self) -> Result<MySqlConnectOptions, ConfigError> {
        Ok(MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .ssl_mode(self.parsed_ssl_mode()?))
    }

    /// Options scoped to the target database.
    pub fn database_options(&self) -> Result<MySqlConnectOptions, ConfigError> {
        Ok(self.server_options()?.database(&self.database))
    }
}
