//! Parameter binding utilities for database queries.
//!
//! This module converts `QueryParam` slices into database-specific argument
//! buffers, which callers pass to `sqlx::query_with` and friends.

use crate::db::query::QueryParam;
use crate::error::{InfraError, InfraResult};
use sqlx::Arguments;
use sqlx::postgres::PgArguments;
use sqlx::sqlite::SqliteArguments;
use sqlx::types::Json;

fn bind_error(err: sqlx::error::BoxDynError) -> InfraError {
    InfraError::invalid_input(format!("Failed to bind parameter: {}", err))
}

/// Build a PostgreSQL argument buffer from query parameters.
pub(crate) fn pg_arguments(params: &[QueryParam]) -> InfraResult<PgArguments> {
    let mut args = PgArguments::default();
    for param in params {
        match param {
            QueryParam::Null => args.add(None::<String>),
            QueryParam::Bool(v) => args.add(*v),
            QueryParam::Int(v) => args.add(*v),
            QueryParam::Float(v) => args.add(*v),
            QueryParam::String(v) => args.add(v.as_str()),
            QueryParam::Json(v) => args.add(Json(v)),
        }
        .map_err(bind_error)?;
    }
    Ok(args)
}

/// Build a SQLite argument buffer from query parameters.
pub(crate) fn sqlite_arguments<'q>(params: &'q [QueryParam]) -> InfraResult<SqliteArguments<'q>> {
    let mut args = SqliteArguments::default();
    for param in params {
        match param {
            QueryParam::Null => args.add(None::<String>),
            QueryParam::Bool(v) => args.add(*v),
            QueryParam::Int(v) => args.add(*v),
            QueryParam::Float(v) => args.add(*v),
            QueryParam::String(v) => args.add(v.as_str()),
            // SQLite doesn't have a native JSON type, store as string
            QueryParam::Json(v) => args.add(v.to_string()),
        }
        .map_err(bind_error)?;
    }
    Ok(args)
}
