use crate::motivation::MotivationPolicy;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_PATH_ENV: &str = "GAME_SCHEDULER_CONFIG";
pub const HTTP_ADDR_ENV: &str = "GAME_SCHEDULER_HTTP_ADDR";
pub const DATABASE_ENV: &str = "GAME_SCHEDULER_DB";
pub const OWNER_ENV: &str = "GAME_SCHEDULER_OWNER";
pub const SESSION_MINUTES_ENV: &str = "GAME_SCHEDULER_SESSION_MINUTES";
pub const HORIZON_DAYS_ENV: &str = "GAME_SCHEDULER_HORIZON_DAYS";

/// Longest generation horizon accepted from configuration.
pub const MAX_HORIZON_DAYS: i64 = 366;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Knobs for schedule generation and scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub session_minutes: i64,
    pub horizon_days: i64,
    /// Report an empty backlog as an error instead of an empty batch.
    pub fail_on_empty_backlog: bool,
    pub motivation: MotivationPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            session_minutes: 60,
            horizon_days: 7,
            fail_on_empty_backlog: false,
            motivation: MotivationPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn session_duration(&self) -> Option<Duration> {
        Duration::try_minutes(self.session_minutes)
    }

    pub fn horizon(&self) -> Option<Duration> {
        Duration::try_days(self.horizon_days)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_minutes <= 0 || self.session_minutes > 24 * 60 {
            return Err(ConfigError::invalid(
                "engine.session_minutes",
                format!("must be between 1 and 1440 (got {})", self.session_minutes),
            ));
        }
        if self.horizon_days <= 0 || self.horizon_days > MAX_HORIZON_DAYS {
            return Err(ConfigError::invalid(
                "engine.horizon_days",
                format!(
                    "must be between 1 and {MAX_HORIZON_DAYS} (got {})",
                    self.horizon_days
                ),
            ));
        }
        self.motivation
            .validate()
            .map_err(|message| ConfigError::invalid("engine.motivation", message))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    /// SQLite file; the in-memory store is used when absent.
    pub database: Option<PathBuf>,
    /// Owner assumed when a request carries no identity header.
    pub default_owner: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:3000".to_string(),
            database: None,
            default_owner: "user_123".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.addr
            .parse()
            .map_err(|err| ConfigError::invalid("server.addr", format!("{err}")))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(raw)?;
        config.engine.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Reads `GAME_SCHEDULER_CONFIG` when set, then applies the individual
    /// environment overrides on top.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(HTTP_ADDR_ENV) {
            self.server.addr = addr;
        }
        if let Some(path) = lookup(DATABASE_ENV) {
            self.server.database = Some(PathBuf::from(path));
        }
        if let Some(owner) = lookup(OWNER_ENV) {
            self.server.default_owner = owner;
        }
        if let Some(raw) = lookup(SESSION_MINUTES_ENV) {
            self.engine.session_minutes = parse_number(SESSION_MINUTES_ENV, &raw)?;
        }
        if let Some(raw) = lookup(HORIZON_DAYS_ENV) {
            self.engine.horizon_days = parse_number(HORIZON_DAYS_ENV, &raw)?;
        }
        self.engine.validate()
    }
}

fn parse_number(key: &str, raw: &str) -> Result<i64, ConfigError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|err| ConfigError::invalid(key, format!("'{raw}': {err}")))
}
