//! Configuration handling for the infrastructure adapters.
//!
//! This module provides configuration management via CLI arguments and
//! environment variables, plus connection pool options with defaults.

use clap::Parser;
use std::time::Duration;
use url::Url;

// Pool configuration defaults
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_MAX_CONNECTIONS_SQLITE: u32 = 1;
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Default timeout for acquiring a cache connection.
pub const DEFAULT_CACHE_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Connection pool configuration options.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PoolOptions {
    /// Maximum connections in pool (default: 10 for PostgreSQL, 1 for SQLite)
    pub max_connections: Option<u32>,
    /// Minimum connections in pool (default: 1)
    pub min_connections: Option<u32>,
    /// Idle timeout in seconds (default: 600)
    pub idle_timeout_secs: Option<u64>,
    /// Connection acquire timeout in seconds (default: 30)
    pub acquire_timeout_secs: Option<u64>,
}

impl PoolOptions {
    /// Get max_connections with default value based on database type.
    pub fn max_connections_or_default(&self, is_sqlite: bool) -> u32 {
        self.max_connections.unwrap_or(if is_sqlite {
            DEFAULT_MAX_CONNECTIONS_SQLITE
        } else {
            DEFAULT_MAX_CONNECTIONS
        })
    }

    /// Get min_connections with default value.
    pub fn min_connections_or_default(&self) -> u32 {
        self.min_connections.unwrap_or(DEFAULT_MIN_CONNECTIONS)
    }

    /// Get idle_timeout with default value.
    pub fn idle_timeout_or_default(&self) -> u64 {
        self.idle_timeout_secs.unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS)
    }

    /// Get acquire_timeout with default value.
    pub fn acquire_timeout_or_default(&self) -> u64 {
        self.acquire_timeout_secs
            .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS)
    }

    /// Validate pool options and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(max) = self.max_connections {
            if max == 0 {
                return Err("max_connections must be greater than 0".to_string());
            }
        }
        if let Some(min) = self.min_connections {
            if min == 0 {
                return Err("min_connections must be greater than 0".to_string());
            }
            if let Some(max) = self.max_connections {
                if min > max {
                    return Err(format!(
                        "min_connections ({}) cannot exceed max_connections ({})",
                        min, max
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Process configuration parsed from CLI arguments and environment variables.
#[derive(Parser, Debug, Clone)]
#[command(name = "platform-infra", version, about = "Infrastructure adapters probe")]
pub struct Config {
    /// Database connection URL (postgres://... or sqlite:...)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Redis connection URL (redis://host:port)
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Service name reported to the tracing collector
    #[arg(long, env = "SERVICE_NAME", default_value = "platform-infra")]
    pub service_name: String,

    /// OTLP collector endpoint (e.g. http://localhost:4317)
    #[arg(long, env = "OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Log level filter (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "JSON_LOGS", default_value_t = false)]
    pub json_logs: bool,

    /// Maximum database pool connections
    #[arg(long, env = "DB_MAX_CONNECTIONS")]
    pub max_connections: Option<u32>,

    /// Minimum database pool connections
    #[arg(long, env = "DB_MIN_CONNECTIONS")]
    pub min_connections: Option<u32>,

    /// Database pool acquire timeout in seconds
    #[arg(long, env = "DB_ACQUIRE_TIMEOUT_SECS")]
    pub acquire_timeout_secs: Option<u64>,

    /// Cache connection acquisition timeout in seconds
    #[arg(long, env = "CACHE_CONNECT_TIMEOUT_SECS", default_value_t = DEFAULT_CACHE_CONNECT_TIMEOUT_SECS)]
    pub cache_connect_timeout_secs: u64,
}

impl Config {
    /// Build pool options from the configured flags.
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            idle_timeout_secs: None,
            acquire_timeout_secs: self.acquire_timeout_secs,
        }
    }

    /// Cache connection acquisition timeout as a duration.
    pub fn cache_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.cache_connect_timeout_secs)
    }

    /// Validate the configured URLs and pool options.
    pub fn validate(&self) -> Result<(), String> {
        if !self.database_url.starts_with("sqlite:") {
            Url::parse(&self.database_url)
                .map_err(|e| format!("Invalid database URL: {e}"))?;
        }
        if let Some(redis_url) = &self.redis_url {
            let url = Url::parse(redis_url).map_err(|e| format!("Invalid Redis URL: {e}"))?;
            if url.scheme() != "redis" && url.scheme() != "rediss" {
                return Err(format!(
                    "Unsupported Redis URL scheme '{}', expected redis:// or rediss://",
                    url.scheme()
                ));
            }
        }
        self.pool_options().validate()
    }
}
