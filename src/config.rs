use std::env;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a valid {kind}, got {value:?}")]
    Invalid {
        name: &'static str,
        kind: &'static str,
        value: String,
    },
}

/// Runtime settings, read from the environment (and `.env`, if present).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub pool_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "orders.db".to_string(),
            host: "0.0.0.0".to_string(),
            port: 50051,
            workers: 10,
            pool_size: 10,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse(&lookup, "PORT", "port number", defaults.port)?,
            workers: parse(&lookup, "WORKERS", "worker count", defaults.workers)?,
            pool_size: parse(&lookup, "DB_POOL_SIZE", "pool size", defaults.pool_size)?,
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    kind: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => match value.trim().parse() {
            Ok(parsed) => Ok(parsed),
            Err(_) => Err(ConfigError::Invalid { name, kind, value }),
        },
    }
}
