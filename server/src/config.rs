use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use database::PoolSettings;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use todo_core::CredentialHasher;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    /// Networked store connection string; selects PostgreSQL when set
    pub url: Option<String>,
    /// Embedded store file used when no URL is configured
    pub sqlite_path: String,
    /// Maximum number of database connections in the pool
    pub max_connections: u32,
    /// Pool acquire timeout in seconds
    pub connection_timeout: u64,
    /// Insert the demo account into an empty embedded store
    #[serde(default)]
    pub seed_demo_data: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Listen address for the HTTP server
    pub listen_addr: String,
    /// Port number to listen on
    pub port: u16,
    /// Directory with the pre-built client, if any
    pub static_dir: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    /// Argon2id memory cost in KiB
    pub hash_memory_kib: u32,
    /// Argon2id iterations
    pub hash_iterations: u32,
    /// Argon2id lanes
    pub hash_parallelism: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (pretty, json, compact)
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}

impl Config {
    /// Load configuration from defaults, `CONFIG_FILE` and the environment
    pub fn from_env() -> Result<Self> {
        let config_file = env::var("CONFIG_FILE").ok();
        Self::load(config_file.as_deref(), false)
    }

    /// Load configuration with a specific file layered over the defaults
    pub fn from_file(path: &str) -> Result<Self> {
        Self::load(Some(path), true)
    }

    fn load(config_file: Option<&str>, file_required: bool) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        // Start with default configuration
        builder = builder.add_source(File::from_str(
            include_str!("../config/default.toml"),
            FileFormat::Toml,
        ));

        if let Some(path) = config_file {
            builder = builder.add_source(
                File::with_name(path)
                    .required(file_required)
                    .format(FileFormat::Toml),
            );
        }

        // TODO_DATABASE__MAX_CONNECTIONS=10 sets database.max_connections
        builder = builder.add_source(
            Environment::with_prefix("TODO")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .context("Failed to build configuration")?;

        let mut result: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        result.apply_env_overrides(|key| env::var(key).ok())?;

        Ok(result)
    }

    /// Apply the standard deployment variables
    ///
    /// `lookup` resolves a variable name, normally from the process
    /// environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(database_url) = lookup("DATABASE_URL") {
            self.database.url = Some(database_url);
        }

        if let Some(sqlite_path) = lookup("SQLITE_PATH") {
            self.database.sqlite_path = sqlite_path;
        }

        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value '{port}'"))?;
        }

        if let Some(listen_addr) = lookup("LISTEN_ADDR") {
            self.server.listen_addr = listen_addr;
        }

        if let Some(log_level) = lookup("LOG_LEVEL") {
            self.logging.level = log_level;
        }

        if let Some(static_dir) = lookup("STATIC_DIR") {
            self.server.static_dir = Some(static_dir);
        }

        Ok(())
    }

    /// The configured connection string, treating a blank one as absent
    pub fn database_url(&self) -> Option<&str> {
        self.database
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// File backing the embedded store, if the embedded store is in use and
    /// is not in-memory
    pub fn sqlite_file(&self) -> Option<PathBuf> {
        let location = match self.database_url() {
            None => self.database.sqlite_path.as_str(),
            Some(url) => url
                .strip_prefix("sqlite://")
                .or_else(|| url.strip_prefix("sqlite:"))?,
        };

        if location.is_empty() || location.starts_with(":memory:") {
            None
        } else {
            Some(PathBuf::from(location))
        }
    }

    /// Pool sizing for the selected backend
    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.database.max_connections,
            acquire_timeout: Duration::from_secs(self.database.connection_timeout),
        }
    }

    /// Credential hasher with the configured work factor
    pub fn credential_hasher(&self) -> Result<CredentialHasher> {
        CredentialHasher::new(
            self.auth.hash_memory_kib,
            self.auth.hash_iterations,
            self.auth.hash_parallelism,
        )
        .context("Invalid password hashing parameters")
    }

    /// Get the server socket address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.listen_addr, self.server.port)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate log level
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(anyhow::anyhow!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                ));
            }
        }

        if let Some(url) = self.database_url() {
            let supported = ["postgres://", "postgresql://", "sqlite:"];
            if !supported.iter().any(|scheme| url.starts_with(scheme)) {
                return Err(anyhow::anyhow!(
                    "Unsupported database URL. Must start with one of: {}",
                    supported.join(", ")
                ));
            }
        } else if self.database.sqlite_path.trim().is_empty() {
            return Err(anyhow::anyhow!("Database sqlite_path cannot be empty"));
        }

        // Validate server configuration
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!(
                "Database max_connections must be greater than 0"
            ));
        }

        self.credential_hasher()?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: None,
                sqlite_path: "data/todo.sqlite".to_string(),
                max_connections: 5,
                connection_timeout: 30,
                seed_demo_data: false,
            },
            server: ServerConfig {
                listen_addr: "0.0.0.0".to_string(),
                port: 5000,
                static_dir: None,
            },
            auth: AuthConfig {
                hash_memory_kib: 19456,
                hash_iterations: 2,
                hash_parallelism: 1,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }
}
