//! TOML-based configuration for sqlsage.
//!
//! Supports a config file (sqlsage.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [generator]
//! base_url = "http://localhost:11434"
//! model = "qwen2.5-coder"
//! timeout_secs = 60
//!
//! [cache]
//! ttl_seconds = 1800
//!
//! [profiler]
//! max_text_length = 50
//! enumeration_threshold = 20
//! sample_size = 5
//!
//! [connections.dev]
//! driver = "postgres"
//! host = "localhost"
//! database = "shop"
//! username = "sage"
//! password = "${DEV_DB_PASSWORD}"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::connection::{ConnectionConfig, Driver};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    #[error("Unsupported driver: {0}")]
    UnsupportedDriver(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Named database connections.
    pub connections: HashMap<String, ConnectionSettings>,

    /// Text-generation collaborator configuration.
    pub generator: GeneratorSettings,

    /// Context cache configuration.
    pub cache: CacheSettings,

    /// Column profiler configuration.
    pub profiler: ProfilerSettings,

    /// Web server configuration.
    pub server: ServerSettings,
}

/// Connection configuration as written in the TOML file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionSettings {
    /// Database driver (postgres, mysql).
    pub driver: String,
    /// Server hostname.
    pub host: String,
    /// Port (optional, driver default when absent).
    #[serde(default)]
    pub port: Option<u16>,
    /// Database name.
    pub database: String,
    /// Username.
    pub username: String,
    /// Password (supports `${ENV_VAR}` expansion).
    #[serde(default)]
    pub password: String,
}

impl ConnectionSettings {
    /// Resolve into a [`ConnectionConfig`], expanding environment variables
    /// in the password.
    pub fn resolve(&self) -> Result<ConnectionConfig, SettingsError> {
        let driver = Driver::from_str(&self.driver)
            .map_err(|_| SettingsError::UnsupportedDriver(self.driver.clone()))?;
        let password = expand_env_vars(&self.password)?;
        Ok(ConnectionConfig {
            driver,
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            username: self.username.clone(),
            password,
        })
    }
}

/// Text-generation collaborator settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Base URL of the Ollama-style API.
    pub base_url: String,

    /// Default model identifier.
    pub model: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Sampling temperature.
    pub temperature: f32,

    /// Nucleus sampling top-p.
    pub top_p: f32,

    /// Top-k sampling.
    pub top_k: u32,

    /// Repeat penalty.
    pub repeat_penalty: f32,

    /// Maximum output tokens.
    pub max_tokens: u32,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "qwen2.5-coder".to_string(),
            timeout_secs: 60,
            temperature: 0.1,
            top_p: 0.9,
            top_k: 40,
            repeat_penalty: 1.1,
            max_tokens: 1500,
        }
    }
}

/// Context cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Entry time-to-live in seconds.
    pub ttl_seconds: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { ttl_seconds: 1800 }
    }
}

/// Column profiler settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProfilerSettings {
    /// Character columns longer than this are not profiled.
    pub max_text_length: i64,

    /// Columns with at most this many distinct values get a full
    /// value-frequency enumeration.
    pub enumeration_threshold: i64,

    /// Sample size for columns above the enumeration threshold.
    pub sample_size: i64,
}

impl Default for ProfilerSettings {
    fn default() -> Self {
        Self {
            max_text_length: 50,
            enumeration_threshold: 20,
            sample_size: 5,
        }
    }
}

/// Web server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Listen port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: 8000 }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `SQLSAGE_CONFIG`
    /// 2. `./sqlsage.toml`
    /// 3. `~/.config/sqlsage/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("SQLSAGE_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("sqlsage.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("sqlsage").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Get a connection by name.
    pub fn get_connection(&self, name: &str) -> Result<&ConnectionSettings, SettingsError> {
        self.connections
            .get(name)
            .ok_or_else(|| SettingsError::ConnectionNotFound(name.to_string()))
    }

    /// Get the default connection ("default" if it exists, otherwise the
    /// first one defined).
    pub fn default_connection(&self) -> Option<(&str, &ConnectionSettings)> {
        if let Some(conn) = self.connections.get("default") {
            return Some(("default", conn));
        }
        self.connections.iter().next().map(|(k, v)| (k.as_str(), v))
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' {
            if chars.peek() == Some(&'{') {
                chars.next(); // consume '{'
                let mut var_name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch == '}' {
                        chars.next(); // consume '}'
                        break;
                    }
                    var_name.push(ch);
                    chars.next();
                }
                let value = env::var(&var_name)
                    .map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
                result.push_str(&value);
            } else {
                let mut var_name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        var_name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if var_name.is_empty() {
                    result.push('$');
                } else {
                    let value = env::var(&var_name)
                        .map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
                    result.push_str(&value);
                }
            }
        } else {
            result.push(c);
        }
    }

    Ok(result)
}
