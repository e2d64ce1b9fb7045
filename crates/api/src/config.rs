//! Process configuration read from the environment.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use invenhub_observability::LogFormat;

const DEV_JWT_SECRET: &str = "invenhub-dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid value `{value}` ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime configuration for the API binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    /// `None` keeps the event log in memory.
    pub data_dir: Option<PathBuf>,
    pub reorder_enabled: bool,
    pub reorder_interval: Duration,
    pub reorder_cooldown: chrono::Duration,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 8080,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl: chrono::Duration::minutes(480),
            data_dir: None,
            reorder_enabled: true,
            reorder_interval: Duration::from_secs(300),
            reorder_cooldown: chrono::Duration::hours(invenhub_infra::reorder::DEFAULT_COOLDOWN_HOURS),
            log_format: LogFormat::Json,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        Ok(Self {
            host: parse(&get, "INVENHUB_HOST", defaults.host)?,
            port: parse(&get, "INVENHUB_PORT", defaults.port)?,
            jwt_secret: get("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            token_ttl: chrono::Duration::minutes(positive(&get, "INVENHUB_TOKEN_TTL_MINUTES", 480)?),
            data_dir: get("INVENHUB_DATA_DIR").map(PathBuf::from),
            reorder_enabled: parse(&get, "INVENHUB_REORDER_ENABLED", defaults.reorder_enabled)?,
            reorder_interval: Duration::from_secs(
                positive(&get, "INVENHUB_REORDER_INTERVAL_SECS", 300)? as u64,
            ),
            reorder_cooldown: chrono::Duration::hours(positive(
                &get,
                "INVENHUB_REORDER_COOLDOWN_HOURS",
                invenhub_infra::reorder::DEFAULT_COOLDOWN_HOURS,
            )?),
            log_format: parse(&get, "INVENHUB_LOG_FORMAT", defaults.log_format)?,
        })
    }

    /// True when `JWT_SECRET` was not provided.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    match get(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

fn positive(get: &impl Fn(&str) -> Option<String>, var: &'static str, default: i64) -> Result<i64, ConfigError> {
    let value: i64 = parse(get, var, default)?;
    if value <= 0 {
        return Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "must be positive".to_string(),
        });
    }
    Ok(value)
}
