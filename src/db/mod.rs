//! Database access layer.
//!
//! This module provides database access functionality:
//! - Connection pool construction over PostgreSQL and SQLite
//! - Named-query execution with per-call timeouts and query logging
//! - Scan-into-struct row deserialization
//! - Transaction management with nested-transaction reuse
//! - Parameter binding and SQL pretty-printing for log output

pub mod client;
pub mod params;
pub mod pool;
pub mod prettier;
pub mod query;
pub mod transaction;
pub mod types;

pub use client::DbClient;
pub use pool::{DatabaseKind, DbPool};
pub use query::{Query, QueryParam, QUERY_TIMEOUT_SECS};
pub use transaction::{TxHandle, TxManager};
