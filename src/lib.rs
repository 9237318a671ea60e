//! Platform Infrastructure Adapters
//!
//! This library provides the infrastructure layer shared by backend services:
//! a Redis cache client, a SQL database adapter with named-query execution,
//! a transaction manager with nested-transaction reuse, and a one-shot
//! distributed-tracing bootstrap.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod telemetry;

pub use config::Config;
pub use error::InfraError;
