//! Configuration for the registration service.

use anyhow::{bail, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Telegram bot configuration
    pub telegram: TelegramConfig,

    /// Admin credentials and token settings
    #[serde(default)]
    pub admin: AdminConfig,

    /// Record storage configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot token; init data is signed with a key derived from it
    pub bot_token: SecretString,

    /// Reject init data older than this (disabled when unset)
    #[serde(default, with = "humantime_serde")]
    pub max_auth_age: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Admin login name
    #[serde(default = "default_admin_username")]
    pub username: String,

    /// Admin password (login is refused for everyone when unset)
    #[serde(default)]
    pub password: Option<SecretString>,

    /// Secret for signing admin tokens (random per process when unset)
    #[serde(default)]
    pub token_secret: Option<SecretString>,

    /// Admin token lifetime
    #[serde(default = "default_token_ttl", with = "humantime_serde")]
    pub token_ttl: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to the encrypted records file
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Enable persistence (if false, records are in-memory only)
    #[serde(default)]
    pub persist: bool,

    /// Secret the file encryption key is derived from
    #[serde(default)]
    pub encryption_key: Option<SecretString>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Global requests per minute
    #[serde(default = "default_global_rpm")]
    pub global_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default implementations
impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            password: None,
            token_secret: None,
            token_ttl: default_token_ttl(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            persist: false,
            encryption_key: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            global_per_minute: default_global_rpm(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_admin_username() -> String {
    "admin".into()
}

fn default_token_ttl() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_store_path() -> PathBuf {
    PathBuf::from("/data/registrations.enc")
}

fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8000
}

fn default_global_rpm() -> u32 {
    60
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        Self::from_config(config)
    }

    fn from_config(config: config::Config) -> Result<Self> {
        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.expose_secret().is_empty() {
            bail!("TELEGRAM__BOT_TOKEN must not be empty");
        }
        if self.store.persist && self.store.encryption_key.is_none() {
            bail!("STORE__ENCRYPTION_KEY is required when STORE__PERSIST is enabled");
        }
        Ok(())
    }
}
