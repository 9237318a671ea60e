//! Named-query execution.
//!
//! `DbClient` normalizes statement execution over a pooled connection with:
//! - a fixed per-statement timeout
//! - query logging (statement name plus parameter-substituted SQL)
//! - explicit transaction routing: when a `TxHandle` is supplied the
//!   statement runs on that transaction, otherwise on a pooled connection
//!   acquired and released by the pool itself
//!
//! # Architecture
//!
//! Each operation carries parallel arms per backend (PostgreSQL, SQLite).
//! The code structure is intentionally parallel to make differences obvious.

use crate::config::PoolOptions;
use crate::db::params::{pg_arguments, sqlite_arguments};
use crate::db::pool::{DatabaseKind, DbPool};
use crate::db::prettier::{self, Placeholder};
use crate::db::query::{Query, QueryParam, QUERY_TIMEOUT_SECS};
use crate::db::transaction::{DbTransaction, TxHandle};
use crate::db::types::{JsonMap, RowToJson};
use crate::error::{InfraError, InfraResult};
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Connection, FromRow};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Database adapter over a pooled connection.
#[derive(Debug, Clone)]
pub struct DbClient {
    pool: DbPool,
}

impl DbClient {
    /// Wrap an existing pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Connect to the database described by the connection string.
    pub async fn connect(connection_string: &str, opts: &PoolOptions) -> InfraResult<Self> {
        Ok(Self::new(DbPool::connect(connection_string, opts).await?))
    }

    /// The underlying pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Close the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn placeholder(&self) -> Placeholder {
        match self.pool.kind() {
            DatabaseKind::Postgres => Placeholder::Dollar,
            DatabaseKind::Sqlite => Placeholder::Question,
        }
    }

    fn log_query(&self, q: &Query, params: &[QueryParam]) {
        let pretty = prettier::pretty(&q.sql, self.placeholder(), params);
        debug!(query = %q.name, sql = %pretty, "Executing query");
    }

    /// Apply the fixed statement timeout to an in-flight operation.
    async fn timed<T>(
        &self,
        name: &str,
        fut: impl Future<Output = InfraResult<T>>,
    ) -> InfraResult<T> {
        match timeout(Duration::from_secs(QUERY_TIMEOUT_SECS), fut).await {
            Ok(result) => result,
            Err(_) => Err(InfraError::timeout(
                format!("query '{}'", name),
                QUERY_TIMEOUT_SECS as u32,
            )),
        }
    }

    /// Execute a write statement and return the number of affected rows.
    pub async fn execute(
        &self,
        tx: Option<&TxHandle>,
        q: &Query,
        params: &[QueryParam],
    ) -> InfraResult<u64> {
        self.log_query(q, params);
        self.timed(&q.name, self.execute_inner(tx, q, params)).await
    }

    async fn execute_inner(
        &self,
        tx: Option<&TxHandle>,
        q: &Query,
        params: &[QueryParam],
    ) -> InfraResult<u64> {
        if let Some(handle) = tx {
            let mut guard = handle.inner().lock().await;
            let active = guard
                .as_mut()
                .ok_or_else(|| InfraError::transaction("run", "transaction is no longer active"))?;
            return match active {
                DbTransaction::Postgres(tx) => {
                    let args = pg_arguments(params)?;
                    let done = sqlx::query_with(&q.sql, args)
                        .execute(&mut **tx)
                        .await
                        .map_err(InfraError::from)?;
                    Ok(done.rows_affected())
                }
                DbTransaction::Sqlite(tx) => {
                    let args = sqlite_arguments(params)?;
                    let done = sqlx::query_with(&q.sql, args)
                        .execute(&mut **tx)
                        .await
                        .map_err(InfraError::from)?;
                    Ok(done.rows_affected())
                }
            };
        }

        match &self.pool {
            DbPool::Postgres(pool) => {
                let args = pg_arguments(params)?;
                let done = sqlx::query_with(&q.sql, args)
                    .execute(pool)
                    .await
                    .map_err(InfraError::from)?;
                Ok(done.rows_affected())
            }
            DbPool::Sqlite(pool) => {
                let args = sqlite_arguments(params)?;
                let done = sqlx::query_with(&q.sql, args)
                    .execute(pool)
                    .await
                    .map_err(InfraError::from)?;
                Ok(done.rows_affected())
            }
        }
    }

    /// Execute a query and return all rows as JSON objects.
    pub async fn query(
        &self,
        tx: Option<&TxHandle>,
        q: &Query,
        params: &[QueryParam],
    ) -> InfraResult<Vec<JsonMap>> {
        self.log_query(q, params);
        self.timed(&q.name, self.query_inner(tx, q, params)).await
    }

    async fn query_inner(
        &self,
        tx: Option<&TxHandle>,
        q: &Query,
        params: &[QueryParam],
    ) -> InfraResult<Vec<JsonMap>> {
        if let Some(handle) = tx {
            let mut guard = handle.inner().lock().await;
            let active = guard
                .as_mut()
                .ok_or_else(|| InfraError::transaction("run", "transaction is no longer active"))?;
            return match active {
                DbTransaction::Postgres(tx) => {
                    let args = pg_arguments(params)?;
                    let rows: Vec<PgRow> = sqlx::query_with(&q.sql, args)
                        .fetch_all(&mut **tx)
                        .await
                        .map_err(InfraError::from)?;
                    Ok(rows.iter().map(RowToJson::to_json_map).collect())
                }
                DbTransaction::Sqlite(tx) => {
                    let args = sqlite_arguments(params)?;
                    let rows: Vec<SqliteRow> = sqlx::query_with(&q.sql, args)
                        .fetch_all(&mut **tx)
                        .await
                        .map_err(InfraError::from)?;
                    Ok(rows.iter().map(RowToJson::to_json_map).collect())
                }
            };
        }

        match &self.pool {
            DbPool::Postgres(pool) => {
                let args = pg_arguments(params)?;
                let rows: Vec<PgRow> = sqlx::query_with(&q.sql, args)
                    .fetch_all(pool)
                    .await
                    .map_err(InfraError::from)?;
                Ok(rows.iter().map(RowToJson::to_json_map).collect())
            }
            DbPool::Sqlite(pool) => {
                let args = sqlite_arguments(params)?;
                let rows: Vec<SqliteRow> = sqlx::query_with(&q.sql, args)
                    .fetch_all(pool)
                    .await
                    .map_err(InfraError::from)?;
                Ok(rows.iter().map(RowToJson::to_json_map).collect())
            }
        }
    }

    /// Execute a query expected to return at most one row.
    pub async fn query_row(
        &self,
        tx: Option<&TxHandle>,
        q: &Query,
        params: &[QueryParam],
    ) -> InfraResult<Option<JsonMap>> {
        self.log_query(q, params);
        self.timed(&q.name, self.query_row_inner(tx, q, params)).await
    }

    async fn query_row_inner(
        &self,
        tx: Option<&TxHandle>,
        q: &Query,
        params: &[QueryParam],
    ) -> InfraResult<Option<JsonMap>> {
        if let Some(handle) = tx {
            let mut guard = handle.inner().lock().await;
            let active = guard
                .as_mut()
                .ok_or_else(|| InfraError::transaction("run", "transaction is no longer active"))?;
            return match active {
                DbTransaction::Postgres(tx) => {
                    let args = pg_arguments(params)?;
                    let row: Option<PgRow> = sqlx::query_with(&q.sql, args)
                        .fetch_optional(&mut **tx)
                        .await
                        .map_err(InfraError::from)?;
                    Ok(row.as_ref().map(RowToJson::to_json_map))
                }
                DbTransaction::Sqlite(tx) => {
                    let args = sqlite_arguments(params)?;
                    let row: Option<SqliteRow> = sqlx::query_with(&q.sql, args)
                        .fetch_optional(&mut **tx)
                        .await
                        .map_err(InfraError::from)?;
                    Ok(row.as_ref().map(RowToJson::to_json_map))
                }
            };
        }

        match &self.pool {
            DbPool::Postgres(pool) => {
                let args = pg_arguments(params)?;
                let row: Option<PgRow> = sqlx::query_with(&q.sql, args)
                    .fetch_optional(pool)
                    .await
                    .map_err(InfraError::from)?;
                Ok(row.as_ref().map(RowToJson::to_json_map))
            }
            DbPool::Sqlite(pool) => {
                let args = sqlite_arguments(params)?;
                let row: Option<SqliteRow> = sqlx::query_with(&q.sql, args)
                    .fetch_optional(pool)
                    .await
                    .map_err(InfraError::from)?;
                Ok(row.as_ref().map(RowToJson::to_json_map))
            }
        }
    }

    /// Execute a query and deserialize the single resulting row into `T`.
    pub async fn fetch_one<T>(
        &self,
        tx: Option<&TxHandle>,
        q: &Query,
        params: &[QueryParam],
    ) -> InfraResult<T>
    where
        T: for<'r> FromRow<'r, PgRow> + for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        self.log_query(q, params);
        self.timed(&q.name, self.fetch_one_inner(tx, q, params)).await
    }

    async fn fetch_one_inner<T>(
        &self,
        tx: Option<&TxHandle>,
        q: &Query,
        params: &[QueryParam],
    ) -> InfraResult<T>
    where
        T: for<'r> FromRow<'r, PgRow> + for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        if let Some(handle) = tx {
            let mut guard = handle.inner().lock().await;
            let active = guard
                .as_mut()
                .ok_or_else(|| InfraError::transaction("run", "transaction is no longer active"))?;
            return match active {
                DbTransaction::Postgres(tx) => {
                    let args = pg_arguments(params)?;
                    sqlx::query_as_with::<_, T, _>(&q.sql, args)
                        .fetch_one(&mut **tx)
                        .await
                        .map_err(InfraError::from)
                }
                DbTransaction::Sqlite(tx) => {
                    let args = sqlite_arguments(params)?;
                    sqlx::query_as_with::<_, T, _>(&q.sql, args)
                        .fetch_one(&mut **tx)
                        .await
                        .map_err(InfraError::from)
                }
            };
        }

        match &self.pool {
            DbPool::Postgres(pool) => {
                let args = pg_arguments(params)?;
                sqlx::query_as_with::<_, T, _>(&q.sql, args)
                    .fetch_one(pool)
                    .await
                    .map_err(InfraError::from)
            }
            DbPool::Sqlite(pool) => {
                let args = sqlite_arguments(params)?;
                sqlx::query_as_with::<_, T, _>(&q.sql, args)
                    .fetch_one(pool)
                    .await
                    .map_err(InfraError::from)
            }
        }
    }

    /// Execute a query and deserialize every resulting row into `T`.
    pub async fn fetch_all<T>(
        &self,
        tx: Option<&TxHandle>,
        q: &Query,
        params: &[QueryParam],
    ) -> InfraResult<Vec<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        self.log_query(q, params);
        self.timed(&q.name, self.fetch_all_inner(tx, q, params)).await
    }

    async fn fetch_all_inner<T>(
        &self,
        tx: Option<&TxHandle>,
        q: &Query,
        params: &[QueryParam],
    ) -> InfraResult<Vec<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        if let Some(handle) = tx {
            let mut guard = handle.inner().lock().await;
            let active = guard
                .as_mut()
                .ok_or_else(|| InfraError::transaction("run", "transaction is no longer active"))?;
            return match active {
                DbTransaction::Postgres(tx) => {
                    let args = pg_arguments(params)?;
                    sqlx::query_as_with::<_, T, _>(&q.sql, args)
                        .fetch_all(&mut **tx)
                        .await
                        .map_err(InfraError::from)
                }
                DbTransaction::Sqlite(tx) => {
                    let args = sqlite_arguments(params)?;
                    sqlx::query_as_with::<_, T, _>(&q.sql, args)
                        .fetch_all(&mut **tx)
                        .await
                        .map_err(InfraError::from)
                }
            };
        }

        match &self.pool {
            DbPool::Postgres(pool) => {
                let args = pg_arguments(params)?;
                sqlx::query_as_with::<_, T, _>(&q.sql, args)
                    .fetch_all(pool)
                    .await
                    .map_err(InfraError::from)
            }
            DbPool::Sqlite(pool) => {
                let args = sqlite_arguments(params)?;
                sqlx::query_as_with::<_, T, _>(&q.sql, args)
                    .fetch_all(pool)
                    .await
                    .map_err(InfraError::from)
            }
        }
    }

    /// Verify database liveness on a dedicated pooled connection.
    pub async fn ping(&self) -> InfraResult<()> {
        let fut = async {
            match &self.pool {
                DbPool::Postgres(pool) => {
                    let mut conn = pool.acquire().await.map_err(InfraError::from)?;
                    conn.ping().await.map_err(InfraError::from)
                }
                DbPool::Sqlite(pool) => {
                    let mut conn = pool.acquire().await.map_err(InfraError::from)?;
                    conn.ping().await.map_err(InfraError::from)
                }
            }
        };
        match timeout(Duration::from_secs(QUERY_TIMEOUT_SECS), fut).await {
            Ok(result) => result,
            Err(_) => Err(InfraError::timeout("ping", QUERY_TIMEOUT_SECS as u32)),
        }
    }

    /// Open a transaction at read-committed isolation.
    pub(crate) async fn begin(&self) -> InfraResult<DbTransaction> {
        match &self.pool {
            DbPool::Postgres(pool) => {
                let mut tx = pool.begin().await.map_err(InfraError::from)?;
                sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
                    .execute(&mut *tx)
                    .await
                    .map_err(InfraError::from)?;
                Ok(DbTransaction::Postgres(tx))
            }
            // SQLite transactions are always serializable; there is no
            // isolation level to set.
            DbPool::Sqlite(pool) => Ok(DbTransaction::Sqlite(
                pool.begin().await.map_err(InfraError::from)?,
            )),
        }
    }
}
