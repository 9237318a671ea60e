//! Integration tests for transaction management against an on-disk SQLite
//! database.

use platform_infra::config::PoolOptions;
use platform_infra::db::{DbClient, Query, QueryParam, TxHandle, TxManager};
use platform_infra::error::{InfraError, InfraResult};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

async fn test_setup(opts: PoolOptions) -> (DbClient, TxManager, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite:{}", dir.path().join("test.db").display());
    let client = DbClient::connect(&url, &opts).await.expect("Failed to connect");

    let create = Query::new(
        "test.create_table",
        "CREATE TABLE entries (id INTEGER PRIMARY KEY, label TEXT NOT NULL)",
    );
    client.execute(None, &create, &[]).await.expect("Failed to create table");

    let manager = TxManager::new(client.clone());
    (client, manager, dir)
}

fn insert_query() -> Query {
    Query::new("test.insert", "INSERT INTO entries (id, label) VALUES (?, ?)")
}

async fn count_entries(client: &DbClient) -> i64 {
    let q = Query::new("test.count", "SELECT COUNT(*) AS n FROM entries");
    let row = client.query_row(None, &q, &[]).await.unwrap().unwrap();
    row["n"].as_i64().unwrap()
}

#[tokio::test]
async fn test_commit_on_success() {
    let (client, manager, _dir) = test_setup(PoolOptions::default()).await;

    let db = client.clone();
    let result: InfraResult<()> = manager
        .read_committed(None, move |tx| async move {
            db.execute(
                Some(&tx),
                &insert_query(),
                &[QueryParam::Int(1), QueryParam::from("first")],
            )
            .await?;
            Ok(())
        })
        .await;

    assert!(result.is_ok());
    assert_eq!(count_entries(&client).await, 1);
}

#[tokio::test]
async fn test_rollback_on_error_discards_all_writes() {
    let (client, manager, _dir) = test_setup(PoolOptions::default()).await;

    // Two writes, then an error on the way out: neither write may persist.
    let db = client.clone();
    let result: InfraResult<()> = manager
        .read_committed(None, move |tx| async move {
            db.execute(
                Some(&tx),
                &insert_query(),
                &[QueryParam::Int(1), QueryParam::from("first")],
            )
            .await?;
            db.execute(
                Some(&tx),
                &insert_query(),
                &[QueryParam::Int(2), QueryParam::from("second")],
            )
            .await?;
            Err(InfraError::invalid_input("boom"))
        })
        .await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("boom"));
    assert_eq!(count_entries(&client).await, 0);
}

#[tokio::test]
async fn test_panic_is_contained_and_rolled_back() {
    let (client, manager, _dir) = test_setup(PoolOptions::default()).await;

    let db = client.clone();
    let result: InfraResult<()> = manager
        .read_committed(None, move |tx| async move {
            db.execute(
                Some(&tx),
                &insert_query(),
                &[QueryParam::Int(1), QueryParam::from("doomed")],
            )
            .await?;
            if true {
                panic!("kaboom");
            }
            Ok(())
        })
        .await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("panic"));
    assert!(err.to_string().contains("kaboom"));
    assert_eq!(count_entries(&client).await, 0);
}

#[tokio::test]
async fn test_nested_call_reuses_transaction() {
    // A single-connection pool with a short acquire timeout: if the nested
    // invocation tried to open a second transaction it could not acquire a
    // connection and the test would fail instead of silently passing.
    let opts = PoolOptions {
        max_connections: Some(1),
        acquire_timeout_secs: Some(1),
        ..Default::default()
    };
    let (client, manager, _dir) = test_setup(opts).await;

    let db_outer = client.clone();
    let db_inner = client.clone();
    let nested_manager = manager.clone();

    let result: InfraResult<()> = manager
        .read_committed(None, move |tx| async move {
            db_outer
                .execute(
                    Some(&tx),
                    &insert_query(),
                    &[QueryParam::Int(1), QueryParam::from("outer")],
                )
                .await?;

            nested_manager
                .read_committed(Some(&tx), move |inner_tx| async move {
                    db_inner
                        .execute(
                            Some(&inner_tx),
                            &insert_query(),
                            &[QueryParam::Int(2), QueryParam::from("inner")],
                        )
                        .await?;
                    Ok(())
                })
                .await?;

            Ok(())
        })
        .await;

    assert!(result.is_ok());
    assert_eq!(count_entries(&client).await, 2);
}

#[tokio::test]
async fn test_outer_error_rolls_back_nested_writes() {
    let (client, manager, _dir) = test_setup(PoolOptions::default()).await;

    let db_inner = client.clone();
    let nested_manager = manager.clone();

    let result: InfraResult<()> = manager
        .read_committed(None, move |tx| async move {
            // The nested invocation succeeds and performs no commit of its
            // own; the outer transaction owns completion.
            nested_manager
                .read_committed(Some(&tx), move |inner_tx| async move {
                    db_inner
                        .execute(
                            Some(&inner_tx),
                            &insert_query(),
                            &[QueryParam::Int(1), QueryParam::from("inner")],
                        )
                        .await?;
                    Ok(())
                })
                .await?;

            Err(InfraError::invalid_input("outer failed"))
        })
        .await;

    assert!(result.is_err());
    assert_eq!(count_entries(&client).await, 0);
}

#[tokio::test]
async fn test_nested_error_passes_through_unchanged() {
    let (client, manager, _dir) = test_setup(PoolOptions::default()).await;

    let nested_manager = manager.clone();
    let result: InfraResult<()> = manager
        .read_committed(None, move |tx| async move {
            let nested: InfraResult<()> = nested_manager
                .read_committed(Some(&tx), |_inner_tx| async move {
                    Err(InfraError::invalid_input("inner failure"))
                })
                .await;

            // Nested outcome arrives as-is, not wrapped by the manager.
            assert!(matches!(nested, Err(InfraError::InvalidInput { .. })));
            nested
        })
        .await;

    assert!(result.is_err());
    assert_eq!(count_entries(&client).await, 0);
}

#[tokio::test]
async fn test_handle_is_released_after_commit() {
    let (client, manager, _dir) = test_setup(PoolOptions::default()).await;

    let saved: Arc<Mutex<Option<TxHandle>>> = Arc::new(Mutex::new(None));
    let saved_in_work = Arc::clone(&saved);
    let db = client.clone();

    manager
        .read_committed(None, move |tx| async move {
            *saved_in_work.lock().unwrap() = Some(tx.clone());
            db.execute(
                Some(&tx),
                &insert_query(),
                &[QueryParam::Int(1), QueryParam::from("kept")],
            )
            .await?;
            Ok(())
        })
        .await
        .unwrap();

    // The handle escaped the unit of work, but commit released the
    // transaction exactly once; further statements on it must fail.
    let leaked = saved.lock().unwrap().take().unwrap();
    let err = client
        .execute(
            Some(&leaked),
            &insert_query(),
            &[QueryParam::Int(2), QueryParam::from("late")],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, InfraError::Transaction { .. }));
    assert_eq!(count_entries(&client).await, 1);
}

#[tokio::test]
async fn test_statements_run_on_the_transaction_connection() {
    // With a single-connection pool the transaction holds the only
    // connection; a handle-routed statement can only succeed if it runs on
    // that same transaction.
    let opts = PoolOptions {
        max_connections: Some(1),
        acquire_timeout_secs: Some(1),
        ..Default::default()
    };
    let (client, manager, _dir) = test_setup(opts).await;

    let db = client.clone();
    let result: InfraResult<u64> = manager
        .read_committed(None, move |tx| async move {
            db.execute(
                Some(&tx),
                &insert_query(),
                &[QueryParam::Int(1), QueryParam::from("routed")],
            )
            .await
        })
        .await;

    assert_eq!(result.unwrap(), 1);
    assert_eq!(count_entries(&client).await, 1);
}
