//! Error types for the infrastructure adapters.
//!
//! This module defines all error types using `thiserror` for ergonomic error
//! handling. Errors surface to the immediate caller with operation/phase
//! context; nothing here retries or suppresses failures.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InfraError {
    #[error("Connection failed: {message}")]
    Connection { message: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
    },

    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("Transaction {phase} failed: {message}")]
    Transaction {
        phase: &'static str,
        message: String,
    },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u32,
    },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Telemetry error: {message}")]
    Telemetry { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl InfraError {
    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
        }
    }

    /// Create a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create a transaction error for the given phase (begin/run/commit/rollback).
    pub fn transaction(phase: &'static str, message: impl Into<String>) -> Self {
        Self::Transaction {
            phase,
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u32) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a telemetry error.
    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is retryable by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }
}

/// Convert sqlx errors to InfraError.
impl From<sqlx::Error> for InfraError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => InfraError::connection(msg.to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                InfraError::database(db_err.message(), code)
            }
            sqlx::Error::RowNotFound => InfraError::database("No rows returned", None),
            sqlx::Error::PoolTimedOut => InfraError::timeout("connection pool acquire", 30),
            sqlx::Error::PoolClosed => InfraError::connection("Connection pool is closed"),
            sqlx::Error::Io(io_err) => InfraError::connection(format!("I/O error: {}", io_err)),
            sqlx::Error::Tls(tls_err) => InfraError::connection(format!("TLS error: {}", tls_err)),
            sqlx::Error::Protocol(msg) => {
                InfraError::connection(format!("Protocol error: {}", msg))
            }
            sqlx::Error::ColumnNotFound(col) => {
                InfraError::decode(format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => InfraError::decode(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                InfraError::decode(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => InfraError::decode(format!("Decode error: {}", source)),
            sqlx::Error::TypeNotFound { type_name } => {
                InfraError::decode(format!("Type not found: {}", type_name))
            }
            sqlx::Error::WorkerCrashed => InfraError::internal("Database worker crashed"),
            _ => InfraError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Convert redis errors to InfraError.
impl From<redis::RedisError> for InfraError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
            InfraError::connection(format!("Redis connection error: {}", err))
        } else if err.is_timeout() {
            InfraError::timeout("cache command", 0)
        } else {
            InfraError::cache(err.to_string())
        }
    }
}

/// Result type alias for infrastructure operations.
pub type InfraResult<T> = Result<T, InfraError>;
