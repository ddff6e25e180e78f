use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// API key accepted by the server, bound to the user it authenticates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiKeyEntry {
    pub key: String,
    pub user_id: String,
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the SQLite database
    pub database_path: ConfigValue<PathBuf>,
    /// Public site root used for sitemap URLs
    pub base_url: ConfigValue<String>,
    /// Port the server listens on
    pub port: ConfigValue<u16>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Server API keys (never printed)
    #[serde(skip)]
    pub api_keys: Vec<ApiKeyEntry>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    base_url: Option<String>,
    port: Option<u16>,
    api_keys: Vec<ApiKeyEntry>,
}

impl Config {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:3000";
    pub const DEFAULT_PORT: u16 = 8080;

    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut database_path = ConfigValue::new(
            Self::default_data_dir().join("abyss.db"),
            ConfigSource::Default,
        );
        let mut base_url =
            ConfigValue::new(Self::DEFAULT_BASE_URL.to_string(), ConfigSource::Default);
        let mut port = ConfigValue::new(Self::DEFAULT_PORT, ConfigSource::Default);
        let mut config_file = None;
        let mut api_keys = Vec::new();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            if let Some(db_path) = file_config.database_path {
                database_path =
                    ConfigValue::new(resolve_relative(&path, db_path), ConfigSource::File);
            }
            if let Some(url) = file_config.base_url {
                base_url = ConfigValue::new(url, ConfigSource::File);
            }
            if let Some(p) = file_config.port {
                port = ConfigValue::new(p, ConfigSource::File);
            }
            api_keys = file_config.api_keys;
            config_file = Some(path);
        }

        // Apply environment variable overrides
        if let Ok(db_path) = std::env::var("ABYSS_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("ABYSS_BASE_URL") {
            base_url = ConfigValue::new(url, ConfigSource::Environment);
        }
        if let Ok(p) = std::env::var("ABYSS_PORT") {
            let parsed = p
                .parse()
                .map_err(|_| ConfigError::InvalidEnv("ABYSS_PORT", p.clone()))?;
            port = ConfigValue::new(parsed, ConfigSource::Environment);
        }

        Ok(Self {
            database_path,
            base_url,
            port,
            config_file,
            api_keys,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/abyss/
    /// - macOS: ~/Library/Application Support/abyss/
    /// - Windows: %APPDATA%/abyss/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("abyss")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/abyss/
    /// - macOS: ~/Library/Application Support/abyss/
    /// - Windows: %APPDATA%/abyss/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("abyss")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// Resolve relative paths against the config file's directory
fn resolve_relative(config_path: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        config_path
            .parent()
            .map(|dir| dir.join(&path))
            .unwrap_or(path)
    } else {
        path
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {1}", .0.display())]
    ReadError(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file '{}': {1}", .0.display())]
    ParseError(PathBuf, #[source] serde_yaml::Error),
    #[error("Invalid value for {0}: '{1}'")]
    InvalidEnv(&'static str, String),
}
