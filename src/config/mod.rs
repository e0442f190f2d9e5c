//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

use crate::util::rate_limit::{EVENT_RATE_LIMIT, INPUT_RATE_LIMIT};
use crate::util::time::DEFAULT_TICK_RATE;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS, `*` accepts any
    pub client_origin: String,
    /// Arena drain ticks per second
    pub tick_rate: u32,
    /// Fixed seed for spawn selection (random when unset)
    pub spawn_seed: Option<u64>,
    /// Movement and control frames per second allowed per connection
    pub input_rate_limit: u32,
    /// Shot and hit-report frames per second allowed per connection
    pub event_rate_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),

            tick_rate: parse_or("TICK_RATE", DEFAULT_TICK_RATE)?,
            spawn_seed: match env::var("SPAWN_SEED") {
                Ok(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid("SPAWN_SEED"))?),
                Err(_) => None,
            },
            input_rate_limit: parse_or("INPUT_RATE_LIMIT", INPUT_RATE_LIMIT)?,
            event_rate_limit: parse_or("EVENT_RATE_LIMIT", EVENT_RATE_LIMIT)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_level: "info".to_string(),
            client_origin: "*".to_string(),
            tick_rate: DEFAULT_TICK_RATE,
            spawn_seed: None,
            input_rate_limit: INPUT_RATE_LIMIT,
            event_rate_limit: EVENT_RATE_LIMIT,
        }
    }
}

fn parse_or(key: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.parse::<u32>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(ConfigError::Invalid(key)),
        },
        Err(_) => Ok(default),
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
