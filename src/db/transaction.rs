//! Transaction management.
//!
//! `TxManager` wraps a unit of work in a database transaction. A unit of work
//! receives a cloneable `TxHandle` and passes it to `DbClient` calls so the
//! statements run on the transaction's dedicated connection. When a caller
//! already holds a handle, nested invocations reuse it instead of opening a
//! second transaction; completion then belongs to the outermost invocation.
//!
//! A panic inside the unit of work is caught, converted into an error so the
//! rollback still runs, and never escapes the manager.

use crate::db::client::DbClient;
use crate::error::{InfraError, InfraResult};
use futures_util::FutureExt;
use sqlx::{Postgres, Sqlite, Transaction};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Database-specific transaction wrapper.
pub enum DbTransaction {
    Postgres(Transaction<'static, Postgres>),
    Sqlite(Transaction<'static, Sqlite>),
}

/// Opaque reference to an open transaction, valid until committed or rolled
/// back. Cloneable so a unit of work can hand it down to collaborators; all
/// clones share the single underlying transaction.
#[derive(Clone)]
pub struct TxHandle {
    id: Arc<str>,
    inner: Arc<Mutex<Option<DbTransaction>>>,
}

impl TxHandle {
    pub(crate) fn new(tx: DbTransaction) -> Self {
        Self {
            id: generate_transaction_id().into(),
            inner: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Identifier used in log output.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn inner(&self) -> &Mutex<Option<DbTransaction>> {
        &self.inner
    }

    /// Commit the transaction. Releases the handle; further statements on it
    /// fail with a transaction error.
    pub(crate) async fn commit(&self) -> InfraResult<()> {
        let tx = self.inner.lock().await.take().ok_or_else(|| {
            InfraError::transaction("commit", "transaction is no longer active")
        })?;
        match tx {
            DbTransaction::Postgres(tx) => tx.commit().await,
            DbTransaction::Sqlite(tx) => tx.commit().await,
        }
        .map_err(|e| InfraError::transaction("commit", e.to_string()))
    }

    /// Roll back the transaction. Releases the handle.
    pub(crate) async fn rollback(&self) -> InfraResult<()> {
        let tx = self.inner.lock().await.take().ok_or_else(|| {
            InfraError::transaction("rollback", "transaction is no longer active")
        })?;
        match tx {
            DbTransaction::Postgres(tx) => tx.rollback().await,
            DbTransaction::Sqlite(tx) => tx.rollback().await,
        }
        .map_err(|e| InfraError::transaction("rollback", e.to_string()))
    }
}

impl std::fmt::Debug for TxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxHandle").field("id", &self.id).finish()
    }
}

/// Runs a unit of work inside a (possibly reused) transaction.
#[derive(Debug, Clone)]
pub struct TxManager {
    db: DbClient,
}

impl TxManager {
    /// Create a new transaction manager over the given database client.
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }

    /// Run `work` inside a read-committed transaction.
    ///
    /// If `active` carries a handle the call is nested: `work` runs with a
    /// clone of that handle and its outcome is returned as-is; the outer
    /// invocation owns commit/rollback. Otherwise a new transaction is
    /// opened and finalized here: commit on success, rollback on error or
    /// panic. Exactly one of commit/rollback runs per begun transaction.
    pub async fn read_committed<T, F, Fut>(
        &self,
        active: Option<&TxHandle>,
        work: F,
    ) -> InfraResult<T>
    where
        F: FnOnce(TxHandle) -> Fut,
        Fut: Future<Output = InfraResult<T>>,
    {
        // Nested call: reuse the active transaction, skip finalization.
        if let Some(handle) = active {
            return work(handle.clone()).await;
        }

        let tx = self
            .db
            .begin()
            .await
            .map_err(|e| InfraError::transaction("begin", e.to_string()))?;
        let handle = TxHandle::new(tx);
        debug!(transaction_id = %handle.id(), "Transaction started");

        let outcome = AssertUnwindSafe(work(handle.clone())).catch_unwind().await;
        let run_result: InfraResult<T> = match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(InfraError::transaction(
                "run",
                format!("unit of work failed: {}", err),
            )),
            Err(payload) => Err(InfraError::transaction(
                "run",
                format!("panic recovered: {}", panic_message(payload.as_ref())),
            )),
        };

        match run_result {
            Ok(value) => {
                handle.commit().await?;
                debug!(transaction_id = %handle.id(), "Transaction committed");
                Ok(value)
            }
            Err(err) => match handle.rollback().await {
                Ok(()) => {
                    debug!(transaction_id = %handle.id(), "Transaction rolled back");
                    Err(err)
                }
                Err(rollback_err) => Err(InfraError::transaction(
                    "rollback",
                    format!("{}; {}", err, rollback_err),
                )),
            },
        }
    }
}

/// Generate a unique transaction ID.
fn generate_transaction_id() -> String {
    format!("tx_{}", uuid::Uuid::new_v4().simple())
}

/// Extract a printable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_id_format() {
        let id = generate_transaction_id();
        assert!(id.starts_with("tx_"));
        assert_eq!(id.len(), 3 + 32); // "tx_" + 32 hex chars
    }

    #[test]
    fn test_panic_message_str() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
    }

    #[test]
    fn test_panic_message_string() {
        let payload: Box<dyn Any + Send> = Box::new("kaput".to_string());
        assert_eq!(panic_message(payload.as_ref()), "kaput");
    }

    #[test]
    fn test_panic_message_other() {
        let payload: Box<dyn Any + Send> = Box::new(17u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
