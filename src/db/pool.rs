//! Connection pool construction.
//!
//! This module builds database-specific pools (PgPool, SqlitePool) from a
//! connection string and pool options. Pool internals (lease management,
//! liveness checks, background maintenance) belong to sqlx.

use crate::config::PoolOptions;
use crate::error::{InfraError, InfraResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{PgPool, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Supported database backends, detected from the connection string scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseKind {
    Postgres,
    Sqlite,
}

impl DatabaseKind {
    /// Detect the backend from a connection string.
    pub fn from_connection_string(s: &str) -> Option<Self> {
        let lower = s.to_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Some(Self::Postgres)
        } else if lower.starts_with("sqlite:") {
            Some(Self::Sqlite)
        } else {
            None
        }
    }
}

impl std::fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres => write!(f, "postgresql"),
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Database-specific connection pool.
#[derive(Debug, Clone)]
pub enum DbPool {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl DbPool {
    /// Connect to the database described by the connection string.
    pub async fn connect(connection_string: &str, opts: &PoolOptions) -> InfraResult<Self> {
        let kind = DatabaseKind::from_connection_string(connection_string).ok_or_else(|| {
            InfraError::invalid_input(format!(
                "Unknown database scheme, expected postgres:// or sqlite: (got '{}')",
                connection_string.split(':').next().unwrap_or("")
            ))
        })?;

        let is_sqlite = kind == DatabaseKind::Sqlite;
        let acquire_timeout = Duration::from_secs(opts.acquire_timeout_or_default());
        let idle_timeout = Some(Duration::from_secs(opts.idle_timeout_or_default()));

        let pool = match kind {
            DatabaseKind::Postgres => {
                let pool = PgPoolOptions::new()
                    .min_connections(opts.min_connections_or_default())
                    .max_connections(opts.max_connections_or_default(is_sqlite))
                    .acquire_timeout(acquire_timeout)
                    .idle_timeout(idle_timeout)
                    .connect(connection_string)
                    .await
                    .map_err(|e| {
                        InfraError::connection(format!("Failed to connect to PostgreSQL: {}", e))
                    })?;
                DbPool::Postgres(pool)
            }
            DatabaseKind::Sqlite => {
                let options = SqliteConnectOptions::from_str(connection_string)
                    .map_err(|e| {
                        InfraError::connection(format!("Invalid SQLite connection string: {}", e))
                    })?
                    .create_if_missing(true);

                let pool = SqlitePoolOptions::new()
                    .min_connections(opts.min_connections_or_default())
                    .max_connections(opts.max_connections_or_default(is_sqlite))
                    .acquire_timeout(acquire_timeout)
                    .idle_timeout(idle_timeout)
                    .connect_with(options)
                    .await
                    .map_err(|e| {
                        InfraError::connection(format!("Failed to connect to SQLite: {}", e))
                    })?;
                DbPool::Sqlite(pool)
            }
        };

        info!(db_kind = %kind, "Connected to database");
        Ok(pool)
    }

    /// Get the database kind for this pool.
    pub fn kind(&self) -> DatabaseKind {
        match self {
            DbPool::Postgres(_) => DatabaseKind::Postgres,
            DbPool::Sqlite(_) => DatabaseKind::Sqlite,
        }
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        match self {
            DbPool::Postgres(pool) => pool.close().await,
            DbPool::Sqlite(pool) => pool.close().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_detection() {
        assert_eq!(
            DatabaseKind::from_connection_string("postgres://u:p@host/db"),
            Some(DatabaseKind::Postgres)
        );
        assert_eq!(
            DatabaseKind::from_connection_string("postgresql://u:p@host/db"),
            Some(DatabaseKind::Postgres)
        );
        assert_eq!(
            DatabaseKind::from_connection_string("sqlite:data.db"),
            Some(DatabaseKind::Sqlite)
        );
        assert_eq!(
            DatabaseKind::from_connection_string("mysql://u:p@host/db"),
            None
        );
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(DatabaseKind::Postgres.to_string(), "postgresql");
        assert_eq!(DatabaseKind::Sqlite.to_string(), "sqlite");
    }
}
