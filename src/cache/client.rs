//! Redis cache adapter.
//!
//! Each operation acquires a connection under the configured acquisition
//! timeout, executes exactly one command, and releases the connection when
//! the call returns regardless of outcome. Command errors propagate verbatim
//! to the caller; nothing here retries.

use crate::error::{InfraError, InfraResult};
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

/// Cache adapter over a Redis client.
#[derive(Clone)]
pub struct CacheClient {
    client: redis::Client,
    connect_timeout: Duration,
}

/// Convert a TTL to whole seconds for the EXPIRE command.
fn ttl_seconds(ttl: Duration) -> i64 {
    ttl.as_secs() as i64
}

impl CacheClient {
    /// Create a cache client for the given Redis URL.
    pub fn new(url: &str, connect_timeout: Duration) -> InfraResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| InfraError::connection(format!("Failed to create Redis client: {}", e)))?;
        Ok(Self {
            client,
            connect_timeout,
        })
    }

    /// Acquire a connection under the acquisition timeout.
    async fn connection(&self) -> InfraResult<MultiplexedConnection> {
        match timeout(
            self.connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to get Redis connection");
                Err(InfraError::from(e))
            }
            Err(_) => Err(InfraError::timeout(
                "cache connection acquire",
                self.connect_timeout.as_secs() as u32,
            )),
        }
    }

    /// Set a key to a string value (SET).
    pub async fn set(&self, key: &str, value: &str) -> InfraResult<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.set(key, value).await.map_err(InfraError::from)?;
        Ok(())
    }

    /// Set multiple fields on a hash key (HSET).
    pub async fn hash_set(&self, key: &str, fields: &[(String, String)]) -> InfraResult<()> {
        let mut conn = self.connection().await?;
        let _: () = conn
            .hset_multiple(key, fields)
            .await
            .map_err(InfraError::from)?;
        Ok(())
    }

    /// Get the string value of a key (GET). Returns `None` when absent.
    pub async fn get(&self, key: &str) -> InfraResult<Option<String>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await.map_err(InfraError::from)?;
        Ok(value)
    }

    /// Get all fields of a hash key (HGETALL).
    pub async fn hget_all(&self, key: &str) -> InfraResult<HashMap<String, String>> {
        let mut conn = self.connection().await?;
        let values: HashMap<String, String> =
            conn.hgetall(key).await.map_err(InfraError::from)?;
        Ok(values)
    }

    /// Set a time-to-live on a key (EXPIRE), truncated to whole seconds.
    pub async fn expire(&self, key: &str, ttl: Duration) -> InfraResult<()> {
        let mut conn = self.connection().await?;
        let _: bool = conn
            .expire(key, ttl_seconds(ttl))
            .await
            .map_err(InfraError::from)?;
        Ok(())
    }

    /// Verify cache liveness (PING).
    pub async fn ping(&self) -> InfraResult<()> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(InfraError::from)?;
        Ok(())
    }
}

impl std::fmt::Debug for CacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheClient")
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}
