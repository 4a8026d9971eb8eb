//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "roster.toml",
    "config.toml",
    "./config/roster.toml",
    "/etc/roster/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found), apply environment overrides, validate
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        self.apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(config)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
            warn!(?path, "Configured config file does not exist, searching defaults");
        }

        if let Ok(path) = env::var("ROSTER_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    fn apply_env_overrides(&self, config: &mut AppConfig) -> Result<(), ConfigError> {
        // HTTP
        if let Ok(val) = env::var("ROSTER_HTTP_PORT") {
            config.http.port = val
                .parse()
                .map_err(|_| ConfigError::ValidationError(format!("invalid ROSTER_HTTP_PORT '{}'", val)))?;
        }
        if let Ok(val) = env::var("ROSTER_HTTP_HOST") {
            config.http.host = val;
        }
        if let Ok(val) = env::var("ROSTER_CORS_ORIGINS") {
            config.http.cors_origins = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Storage
        if let Ok(val) = env::var("ROSTER_STORAGE_BACKEND") {
            config.storage.backend = val.parse()?;
        }
        if let Ok(val) = env::var("ROSTER_MONGODB_URI") {
            config.mongodb.uri = val;
        }
        if let Ok(val) = env::var("ROSTER_MONGODB_DATABASE") {
            config.mongodb.database = val;
        }

        // Admin
        if let Ok(val) = env::var("ROSTER_ADMIN_BASE_PATH") {
            config.admin.base_path = val;
        }
        if let Ok(val) = env::var("ROSTER_LOCALE") {
            config.admin.locale = val;
        }
        if let Ok(val) = env::var("ROSTER_DEFAULT_PAGE_SIZE") {
            if let Ok(size) = val.parse() {
                config.admin.default_page_size = size;
            }
        }
        if let Ok(val) = env::var("ROSTER_MAX_PAGE_SIZE") {
            if let Ok(size) = val.parse() {
                config.admin.max_page_size = size;
            }
        }

        // Password
        if let Ok(val) = env::var("ROSTER_PASSWORD_MIN_LENGTH") {
            if let Ok(len) = val.parse() {
                config.password.min_length = len;
            }
        }
        if let Ok(val) = env::var("ROSTER_PASSWORD_STRICT") {
            config.password.strict = val == "true" || val == "1";
        }

        // Logging
        if let Ok(val) = env::var("ROSTER_LOG_LEVEL") {
            config.logging.level = val;
        }

        // General
        if let Ok(val) = env::var("ROSTER_DEV_MODE") {
            config.dev_mode = val == "true" || val == "1";
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
