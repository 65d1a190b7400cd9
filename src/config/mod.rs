//! Configuration module for guildwarden.
//!
//! Loads configuration from environment variables.

mod settings;

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub use settings::JsonSettings;

/// Which backing store to run against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreBackendKind {
    #[default]
    Mongo,
    Memory,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: StoreBackendKind,

    // MongoDB
    pub mongodb_uri: Option<String>,
    pub mongodb_database: String,
    pub mongodb_timeout: Duration,

    /// Log channel given to newly created guilds.
    pub default_log_channel_id: u64,

    /// Newline-separated word list imported on first seeding.
    pub legacy_curse_file: PathBuf,

    /// Expiry sweep interval of the memory backend.
    pub expiry_sweep: Duration,

    pub guild_cache_capacity: u64,
    pub settings_file: PathBuf,
}

impl Config {
    /// Load configuration from environment variables (and `.env`).
    ///
    /// # Errors
    /// Fails if a variable is malformed, or `MONGODB_URI` is missing while
    /// the mongo backend is selected.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let backend = match var("STORE_BACKEND").map(|v| v.to_lowercase()).as_deref() {
            None | Some("mongo") | Some("mongodb") => StoreBackendKind::Mongo,
            Some("memory") => StoreBackendKind::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    value: other.to_string(),
                });
            }
        };

        let mongodb_uri = var("MONGODB_URI");
        if backend == StoreBackendKind::Mongo && mongodb_uri.is_none() {
            return Err(ConfigError::Missing("MONGODB_URI"));
        }

        let timeout_secs: u64 = parse_or("MONGODB_TIMEOUT_SECS", var("MONGODB_TIMEOUT_SECS"), 10)?;
        let sweep_secs: u64 = parse_or("EXPIRY_SWEEP_SECS", var("EXPIRY_SWEEP_SECS"), 30)?;

        Ok(Self {
            backend,
            mongodb_uri,
            mongodb_database: var("MONGODB_DATABASE").unwrap_or_else(|| "guildwarden".to_string()),
            mongodb_timeout: Duration::from_secs(timeout_secs.max(1)),
            default_log_channel_id: parse_or(
                "DEFAULT_LOG_CHANNEL_ID",
                var("DEFAULT_LOG_CHANNEL_ID"),
                0,
            )?,
            legacy_curse_file: var("LEGACY_CURSE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("curse.txt")),
            expiry_sweep: Duration::from_secs(sweep_secs.clamp(1, 60)),
            guild_cache_capacity: parse_or(
                "GUILD_CACHE_CAPACITY",
                var("GUILD_CACHE_CAPACITY"),
                10_000,
            )?,
            settings_file: var("SETTINGS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("custom_config.json")),
        })
    }
}

fn parse_or<T: FromStr>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
