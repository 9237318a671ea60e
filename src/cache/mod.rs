//! Cache access layer.
//!
//! Key/value operations over Redis with per-call connection acquisition
//! under a bounded timeout.

pub mod client;

pub use client::CacheClient;
