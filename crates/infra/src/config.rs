//! Process configuration loaded from environment variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use eventhub_core::pagination::DEFAULT_MAX_LIMIT;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080);
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is not a valid value: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("{0} must be set when USE_PERSISTENT_STORES=true")]
    Missing(&'static str),
}

/// Which store backs the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreBackend,
    /// Upper bound for the `limit` query parameter of paged reports.
    pub report_max_limit: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = parse_or("EVENTHUB_BIND_ADDR", lookup("EVENTHUB_BIND_ADDR"), || {
            Ok(DEFAULT_BIND_ADDR)
        })?;

        // Anything but a literal `true` keeps the in-memory store.
        let use_persistent = lookup("USE_PERSISTENT_STORES")
            .map(|v| v.trim().parse::<bool>().unwrap_or(false))
            .unwrap_or(false);

        let store = if use_persistent {
            let database_url = lookup("DATABASE_URL")
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing("DATABASE_URL"))?;
            let max_connections = parse_or("DB_MAX_CONNECTIONS", lookup("DB_MAX_CONNECTIONS"), || {
                Ok(DEFAULT_MAX_CONNECTIONS)
            })?;
            StoreBackend::Postgres {
                database_url,
                max_connections,
            }
        } else {
            StoreBackend::InMemory
        };

        let report_max_limit = parse_or("REPORT_MAX_LIMIT", lookup("REPORT_MAX_LIMIT"), || {
            Ok(DEFAULT_MAX_LIMIT)
        })?;

        Ok(Self {
            bind_addr,
            store,
            report_max_limit,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR,
            store: StoreBackend::InMemory,
            report_max_limit: DEFAULT_MAX_LIMIT,
        }
    }
}

fn parse_or<T, D>(name: &'static str, raw: Option<String>, default: D) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    D: FnOnce() -> Result<T, ConfigError>,
{
    match raw {
        None => default(),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
