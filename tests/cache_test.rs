//! Integration tests for the cache adapter.
//!
//! These tests require a running Redis server. Set the TEST_REDIS_URL
//! environment variable to run them.
//! Example: TEST_REDIS_URL="redis://127.0.0.1:6379"

use platform_infra::cache::CacheClient;
use std::time::Duration;
use uuid::Uuid;

fn test_cache() -> Option<CacheClient> {
    let url = match std::env::var("TEST_REDIS_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: TEST_REDIS_URL not set");
            return None;
        }
    };
    Some(CacheClient::new(&url, Duration::from_secs(5)).expect("Failed to create cache client"))
}

// Keys are namespaced per test run so concurrent runs against a shared
// server do not interfere.
fn test_key(suffix: &str) -> String {
    format!("platform_infra_test:{}:{}", Uuid::new_v4().simple(), suffix)
}

#[tokio::test]
async fn test_set_get_roundtrip() {
    let Some(cache) = test_cache() else { return };
    let key = test_key("kv");

    cache.set(&key, "hello").await.unwrap();
    let value = cache.get(&key).await.unwrap();
    assert_eq!(value.as_deref(), Some("hello"));
}

#[tokio::test]
async fn test_get_absent_key_is_none() {
    let Some(cache) = test_cache() else { return };
    let key = test_key("missing");

    let value = cache.get(&key).await.unwrap();
    assert!(value.is_none());
}

#[tokio::test]
async fn test_hash_set_and_hget_all() {
    let Some(cache) = test_cache() else { return };
    let key = test_key("hash");

    cache
        .hash_set(
            &key,
            &[
                ("field_a".to_string(), "1".to_string()),
                ("field_b".to_string(), "two".to_string()),
            ],
        )
        .await
        .unwrap();

    let fields = cache.hget_all(&key).await.unwrap();
    assert_eq!(fields.len(), 2);
    assert_eq!(fields.get("field_a").map(String::as_str), Some("1"));
    assert_eq!(fields.get("field_b").map(String::as_str), Some("two"));
}

#[tokio::test]
async fn test_hget_all_absent_key_is_empty() {
    let Some(cache) = test_cache() else { return };
    let key = test_key("no_hash");

    let fields = cache.hget_all(&key).await.unwrap();
    assert!(fields.is_empty());
}

#[tokio::test]
async fn test_expire_removes_key() {
    let Some(cache) = test_cache() else { return };
    let key = test_key("expiring");

    cache.set(&key, "transient").await.unwrap();
    cache.expire(&key, Duration::from_secs(1)).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let value = cache.get(&key).await.unwrap();
    assert!(value.is_none());
}

#[tokio::test]
async fn test_ping() {
    let Some(cache) = test_cache() else { return };
    cache.ping().await.expect("Ping failed");
}
