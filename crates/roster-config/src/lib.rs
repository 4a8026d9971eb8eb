//! Roster Configuration System
//!
//! TOML-based configuration with environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub storage: StorageConfig,
    pub mongodb: MongoConfig,
    pub admin: AdminConfig,
    pub password: PasswordConfig,
    pub logging: LoggingConfig,

    /// Seed default roles, permissions and an administrator on startup
    pub dev_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            storage: StorageConfig::default(),
            mongodb: MongoConfig::default(),
            admin: AdminConfig::default(),
            password: PasswordConfig::default(),
            logging: LoggingConfig::default(),
            dev_mode: false,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

impl HttpConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Which repository implementation backs the admin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Mongodb,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(Self::Mongodb),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(ConfigError::ValidationError(format!(
                "unknown storage backend '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

/// MongoDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "roster".to_string(),
        }
    }
}

/// User admin behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Route prefix of the user admin
    pub base_path: String,
    /// Message catalog: "en" or "zh-CN"
    pub locale: String,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            base_path: "/admin/auth/user".to_string(),
            locale: "en".to_string(),
            default_page_size: 15,
            max_page_size: 100,
        }
    }
}

/// Password policy and Argon2 cost
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordConfig {
    pub min_length: usize,
    pub max_length: usize,
    /// Require upper, lower, digit and special characters
    pub strict: bool,
    /// Argon2 memory cost in KiB
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            strict: false,
            memory_cost: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// "text" or "json"
    pub format: String,
    /// Used when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admin.default_page_size == 0 {
            return Err(ConfigError::ValidationError(
                "admin.default_page_size must be positive".to_string(),
            ));
        }
        if self.admin.max_page_size < self.admin.default_page_size {
            return Err(ConfigError::ValidationError(
                "admin.max_page_size must not be below admin.default_page_size".to_string(),
            ));
        }
        if !self.admin.base_path.starts_with('/') || self.admin.base_path.ends_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "admin.base_path '{}' must start with '/' and not end with one",
                self.admin.base_path
            )));
        }
        if self.password.min_length > self.password.max_length {
            return Err(ConfigError::ValidationError(
                "password.min_length exceeds password.max_length".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# Roster Configuration
# Environment variables (ROSTER_*) override these settings

dev_mode = false

[http]
port = 8080
host = "0.0.0.0"
cors_origins = []

[storage]
backend = "mongodb"  # mongodb or memory

[mongodb]
uri = "mongodb://localhost:27017"
database = "roster"

[admin]
base_path = "/admin/auth/user"
locale = "en"  # en or zh-CN
default_page_size = 15
max_page_size = 100

[password]
min_length = 8
max_length = 128
strict = false
memory_cost = 65536
time_cost = 3
parallelism = 4

[logging]
format = "text"  # text or json
level = "info"
"#
        .to_string()
    }
}
