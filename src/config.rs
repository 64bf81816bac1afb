// src/config.rs
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::Level;

use crate::{errors::TrackerError, services::location_service::LocationSettings};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

impl From<ConfigError> for TrackerError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Empty(name) => TrackerError::MissingEnvironmentVariable(name.to_string()),
            other => TrackerError::InvalidConfiguration(other.to_string()),
        }
    }
}

/// Where the mock backend keeps its rides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Redis,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "redis" => Ok(StoreBackend::Redis),
            other => Err(format!("unknown backend {}, expected memory or redis", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub retry_count: u32,
    pub retry_delay: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.schoolbusapp.com".to_string(),
            timeout: Duration::from_millis(30_000),
            retry_count: 3,
            retry_delay: Duration::from_millis(1_000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub backend: StoreBackend,
    pub redis_url: String,
    pub bind_addr: SocketAddr,
    pub driver_id: String,
    pub log_level: Level,
    pub location: LocationSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            backend: StoreBackend::Memory,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            driver_id: "1".to_string(),
            log_level: Level::INFO,
            location: LocationSettings::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any key lookup. Unset keys fall back to
    /// the defaults; set keys must parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let base_url = string_or(&lookup, "API_BASE_URL", defaults.api.base_url)?;
        let base_url = base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                name: "API_BASE_URL",
                value: base_url,
                reason: "expected an http(s) URL".to_string(),
            });
        }

        let api = ApiConfig {
            base_url,
            timeout: Duration::from_millis(parse_or(&lookup, "API_TIMEOUT_MS", 30_000u64)?),
            retry_count: parse_or(&lookup, "API_RETRY_COUNT", defaults.api.retry_count)?,
            retry_delay: Duration::from_millis(parse_or(&lookup, "API_RETRY_DELAY_MS", 1_000u64)?),
        };

        let time_interval_ms: i64 = parse_or(&lookup, "LOCATION_TIME_INTERVAL_MS", 10_000)?;
        let distance_interval_m: f64 = parse_or(&lookup, "LOCATION_DISTANCE_INTERVAL_M", 50.0)?;
        if time_interval_ms < 0 || !distance_interval_m.is_finite() || distance_interval_m < 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "LOCATION_DISTANCE_INTERVAL_M",
                value: format!("{} ms / {} m", time_interval_ms, distance_interval_m),
                reason: "intervals must be non-negative".to_string(),
            });
        }

        Ok(Self {
            api,
            backend: parse_or(&lookup, "STORE_BACKEND", defaults.backend)?,
            redis_url: string_or(&lookup, "REDIS_URL", defaults.redis_url)?,
            bind_addr: parse_or(&lookup, "BIND_ADDR", defaults.bind_addr)?,
            driver_id: string_or(&lookup, "DRIVER_ID", defaults.driver_id)?,
            log_level: parse_or(&lookup, "LOG_LEVEL", defaults.log_level)?,
            location: LocationSettings {
                time_interval: chrono::Duration::milliseconds(time_interval_ms),
                distance_interval_m,
            },
        })
    }
}

fn string_or<F>(lookup: &F, name: &'static str, default: String) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) if value.trim().is_empty() => Err(ConfigError::Empty(name)),
        Some(value) => Ok(value.trim().to_string()),
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|e| ConfigError::InvalidValue {
                name,
                value,
                reason: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api, ApiConfig::default());
        assert_eq!(config.backend, StoreBackend::Memory);
        assert_eq!(config.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.driver_id, "1");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.location, LocationSettings::default());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("API_BASE_URL", "http://localhost:4000/"),
            ("API_TIMEOUT_MS", "500"),
            ("API_RETRY_COUNT", "0"),
            ("LOG_LEVEL", "debug"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("LOCATION_DISTANCE_INTERVAL_M", "25.5"),
            ("STORE_BACKEND", "Redis"),
        ]))
        .unwrap();

        assert_eq!(config.api.base_url, "http://localhost:4000");
        assert_eq!(config.api.timeout, Duration::from_millis(500));
        assert_eq!(config.api.retry_count, 0);
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.location.distance_interval_m, 25.5);
        assert_eq!(config.backend, StoreBackend::Redis);
    }

    #[test]
    fn test_invalid_values() {
        let err = AppConfig::from_lookup(lookup(&[("API_TIMEOUT_MS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "API_TIMEOUT_MS", .. }));

        let err = AppConfig::from_lookup(lookup(&[("API_BASE_URL", "ftp://x")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "API_BASE_URL", .. }));

        let err = AppConfig::from_lookup(lookup(&[("DRIVER_ID", "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::Empty("DRIVER_ID"));
        assert!(matches!(TrackerError::from(err), TrackerError::MissingEnvironmentVariable(_)));

        let err = AppConfig::from_lookup(lookup(&[("LOG_LEVEL", "loud")])).unwrap_err();
        assert!(matches!(TrackerError::from(err), TrackerError::InvalidConfiguration(_)));
    }
}
