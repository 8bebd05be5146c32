use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::neo4j::DbCredentials;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub schemascope: SchemascopeConfig,
    pub store: StoreConfig,
    pub aggregate: AggregateConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
}

/// Process-level settings
#[derive(Debug, Clone, Deserialize)]
pub struct SchemascopeConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for SchemascopeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Default graph store connection settings.
///
/// Requests may override any of these per call.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_uri")]
    pub uri: String,
    #[serde(default = "default_store_user")]
    pub user: String,
    /// Name of the environment variable holding the password
    #[serde(default = "default_password_env")]
    pub password_env: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Snapshot backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Json,
    Sqlite,
}

/// Aggregation and persistence settings
#[derive(Debug, Clone, Deserialize)]
pub struct AggregateConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    pub path: PathBuf,
    /// Collapse identical relationship patterns per label
    #[serde(default)]
    pub dedup_relationships: bool,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default = "default_http_host")]
    pub host: String,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            host: default_http_host(),
            allowed_origins: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_store_uri() -> String {
    "http://localhost:7474".to_string()
}

fn default_store_user() -> String {
    "neo4j".to_string()
}

fn default_password_env() -> String {
    "NEO4J_PASSWORD".to_string()
}

fn default_database() -> String {
    "neo4j".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_backend() -> StoreBackend {
    StoreBackend::Json
}

fn default_http_port() -> u16 {
    8000
}

fn default_http_host() -> String {
    "127.0.0.1".to_string()
}

const FALLBACK_PASSWORD: &str = "password";

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in SCHEMASCOPE_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("SCHEMASCOPE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        Self::from_toml_str(&config_str)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("Failed to parse config.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        url::Url::parse(&self.store.uri)
            .with_context(|| format!("store.uri is not a valid URL: {}", self.store.uri))?;

        if self.store.database.trim().is_empty() {
            anyhow::bail!("store.database must not be empty");
        }

        if self.store.timeout_secs == 0 {
            anyhow::bail!("store.timeout_secs must be greater than 0");
        }

        if self.aggregate.path.as_os_str().is_empty() {
            anyhow::bail!("aggregate.path must not be empty");
        }

        if self.aggregate.path.is_dir() {
            anyhow::bail!(
                "aggregate.path must be a file, not a directory: {}",
                self.aggregate.path.display()
            );
        }

        Ok(())
    }

    /// Default credentials for the graph store.
    ///
    /// The password comes from the environment variable named by
    /// `store.password_env`.
    pub fn default_credentials(&self) -> DbCredentials {
        let password = std::env::var(&self.store.password_env).unwrap_or_else(|_| {
            log::warn!(
                "Environment variable {} not set, using the default Neo4j password",
                self.store.password_env
            );
            FALLBACK_PASSWORD.to_string()
        });

        DbCredentials {
            uri: Some(self.store.uri.clone()),
            user: Some(self.store.user.clone()),
            password: Some(password),
            database: Some(self.store.database.clone()),
        }
    }

    /// Get the snapshot path
    pub fn aggregate_path(&self) -> &Path {
        &self.aggregate.path
    }
}
