//! Server configuration loading from file and environment variables.

use parley_llm::LlmConfig;
use parley_voice::AudioConfig;
use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Credential issuing/verification settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Text-generation gateway settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Speech gateway settings.
    #[serde(default)]
    pub audio: AudioConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Fixed-window request limit per caller per minute.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Busy timeout for SQLite connections, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled SQLite connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "parley_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Token issuing configuration.
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared secret for signing access tokens. Must be overridden in any
    /// real deployment; the default exists so tests and first-run demos
    /// work out of the box.
    #[serde(default = "default_auth_secret")]
    pub secret: String,

    /// Access token lifetime in minutes.
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"[REDACTED]")
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .finish()
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8000
}

fn default_rate_limit() -> u32 {
    120
}

fn default_db_path() -> String {
    "parley.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_auth_secret() -> String {
    "parley-dev-secret".to_string()
}

fn default_token_ttl_minutes() -> i64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            rate_limit_per_minute: default_rate_limit(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: default_auth_secret(),
            token_ttl_minutes: default_token_ttl_minutes(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `PARLEY_HOST` overrides `server.host`
/// - `PARLEY_PORT` overrides `server.port`
/// - `PARLEY_DB_PATH` overrides `database.path`
/// - `PARLEY_LOG_LEVEL` overrides `logging.level`
/// - `PARLEY_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `PARLEY_AUTH_SECRET` overrides `auth.secret`
/// - `PARLEY_LLM_ENDPOINT` / `PARLEY_LLM_API_KEY` override the LLM gateway
/// - `PARLEY_AUDIO_ENDPOINT` / `PARLEY_AUDIO_API_KEY` override the speech gateway
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(host) = std::env::var("PARLEY_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("PARLEY_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(db_path) = std::env::var("PARLEY_DB_PATH") {
        config.database.path = db_path;
    }
    if let Ok(level) = std::env::var("PARLEY_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("PARLEY_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(secret) = std::env::var("PARLEY_AUTH_SECRET") {
        config.auth.secret = secret;
    }
    if let Ok(endpoint) = std::env::var("PARLEY_LLM_ENDPOINT") {
        config.llm.endpoint = endpoint;
    }
    if let Ok(api_key) = std::env::var("PARLEY_LLM_API_KEY") {
        config.llm.api_key = api_key;
    }
    if let Ok(endpoint) = std::env::var("PARLEY_AUDIO_ENDPOINT") {
        config.audio.endpoint = endpoint;
    }
    if let Ok(api_key) = std::env::var("PARLEY_AUDIO_API_KEY") {
        config.audio.api_key = api_key;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_no_file() {
        let config = load_config(None).expect("defaults should load");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.database.path, "parley.db");
        assert_eq!(config.auth.token_ttl_minutes, 30);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: Config = toml::from_str(
            "[server]\nport = 9000\n\n[llm]\nendpoint = \"https://llm.example.com/v1\"\n",
        )
        .expect("partial config should parse");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.llm.endpoint, "https://llm.example.com/v1");
        assert_eq!(config.llm.model, "deepseek-v3");
    }

    #[test]
    fn auth_debug_redacts_secret() {
        let config = Config::default();
        let debug = format!("{:?}", config.auth);
        assert!(!debug.contains("parley-dev-secret"));
    }
}
