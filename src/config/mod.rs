//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Period of the simulation tick driver
    pub tick_interval: Duration,
    /// Period of the enemy spawn driver
    pub spawn_interval: Duration,
    /// Optional cap on match length; unset means matches run until resolved
    pub match_time_limit: Option<Duration>,
    /// Fixed seed for enemy spawns (random when unset)
    pub rng_seed: Option<u64>,

    /// Allowed client origins for CORS; empty allows any origin
    pub client_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_level: "info".to_string(),
            tick_interval: Duration::from_millis(50),
            spawn_interval: Duration::from_millis(500),
            match_time_limit: None,
            rng_seed: None,
            client_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        // Hosting platforms provide PORT; fall back to SERVER_ADDR or default
        let server_addr: SocketAddr = match (lookup("PORT"), lookup("SERVER_ADDR")) {
            (Some(port), _) => format!("0.0.0.0:{}", port.trim())
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            (None, Some(addr)) => addr.trim().parse().map_err(|_| ConfigError::InvalidAddress)?,
            (None, None) => defaults.server_addr,
        };

        let tick_interval =
            parse_millis(&lookup, "TICK_INTERVAL_MS")?.unwrap_or(defaults.tick_interval);
        let spawn_interval =
            parse_millis(&lookup, "SPAWN_INTERVAL_MS")?.unwrap_or(defaults.spawn_interval);

        let match_time_limit = parse::<u64, _>(&lookup, "MATCH_TIME_LIMIT_SECS")?
            .map(|secs| {
                if secs == 0 {
                    Err(ConfigError::Invalid("MATCH_TIME_LIMIT_SECS"))
                } else {
                    Ok(Duration::from_secs(secs))
                }
            })
            .transpose()?;

        let client_origins = lookup("CLIENT_ORIGIN")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            server_addr,
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            tick_interval,
            spawn_interval,
            match_time_limit,
            rng_seed: parse(&lookup, "RNG_SEED")?,
            client_origins,
        })
    }
}

fn parse<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| raw.trim().parse().map_err(|_| ConfigError::Invalid(key)))
        .transpose()
}

fn parse_millis<F>(lookup: &F, key: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse::<u64, _>(lookup, key)? {
        Some(0) => Err(ConfigError::Invalid(key)),
        other => Ok(other.map(Duration::from_millis)),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
