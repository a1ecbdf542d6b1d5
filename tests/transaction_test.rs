mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Call, MockBackend};
use pretty_assertions::assert_eq;
use rowmap::prelude::*;
use rowmap::transaction::CommitCoordinator;

fn insert(value: i64) -> CompiledStatement {
    CompiledStatement::new("INSERT INTO t (a) VALUES (?)", vec![Value::Int(value)])
}

#[tokio::test]
async fn test_new_transaction_is_open() {
    let transaction = ManagedTransaction::new(Arc::new(MockBackend::new()));
    assert_eq!(transaction.status(), TransactionStatus::Open);
    assert!(transaction.is_active());
    assert!(transaction.id().starts_with("transaction_"));
    assert!(!transaction.id().contains('-'));
}

#[tokio::test]
async fn test_statements_wait_for_commit() {
    let backend = Arc::new(MockBackend::new());
    let mut transaction = ManagedTransaction::new(backend.clone());
    transaction.add(&insert(1)).unwrap();
    transaction.add_statement("DELETE FROM t", Vec::new()).unwrap();

    assert!(backend.calls().is_empty());
    assert_eq!(transaction.pending().len(), 2);
}

#[tokio::test]
async fn test_commit_open_wraps_stack_in_one_call() {
    let backend = Arc::new(MockBackend::new());
    let mut transaction = ManagedTransaction::new(backend.clone());
    transaction.add(&insert(1)).unwrap();
    transaction.add(&insert(2)).unwrap();
    transaction.commit().await.unwrap();

    assert_eq!(
        backend.calls(),
        vec![Call::Sql(
            "BEGIN TRANSACTION;INSERT INTO t (a) VALUES (?);INSERT INTO t (a) VALUES (?);COMMIT TRANSACTION;"
                .to_string(),
            vec![Value::Int(1), Value::Int(2)],
        )]
    );
    assert_eq!(transaction.status(), TransactionStatus::Committed);
    assert!(transaction.pending().is_empty());
}

#[tokio::test]
async fn test_commit_open_uses_batch_when_supported() {
    let backend = Arc::new(MockBackend::with_batch());
    let mut transaction = ManagedTransaction::new(backend.clone());
    transaction.add(&insert(1)).unwrap();
    transaction.add(&insert(2)).unwrap();
    transaction.commit().await.unwrap();

    assert_eq!(backend.calls(), vec![Call::Batch(vec![insert(1), insert(2)])]);
    assert_eq!(transaction.status(), TransactionStatus::Committed);
}

#[tokio::test]
async fn test_commit_empty_open_sends_nothing() {
    let backend = Arc::new(MockBackend::new());
    let mut transaction = ManagedTransaction::new(backend.clone());
    transaction.commit().await.unwrap();

    assert!(backend.calls().is_empty());
    assert_eq!(transaction.status(), TransactionStatus::Committed);
}

#[tokio::test]
async fn test_failed_open_commit_tries_rollback() {
    let backend = Arc::new(MockBackend::failing_on(0));
    let mut transaction = ManagedTransaction::new(backend.clone());
    transaction.add(&insert(1)).unwrap();

    assert!(transaction.commit().await.is_err());
    assert_eq!(backend.sql()[1], "ROLLBACK TRANSACTION");
    assert_eq!(transaction.status(), TransactionStatus::Open);
    assert_eq!(transaction.pending().len(), 1);
}

#[tokio::test]
async fn test_execute_immediate_starts_transaction() {
    let backend = Arc::new(MockBackend::new());
    let mut transaction = ManagedTransaction::new(backend.clone());
    transaction.add(&insert(1)).unwrap();

    let results = transaction.execute_immediate(&insert(2)).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(transaction.status(), TransactionStatus::Started);
    assert!(transaction.pending().is_empty());

    transaction.add(&insert(3)).unwrap();
    transaction.commit().await.unwrap();

    assert_eq!(
        backend.calls(),
        vec![
            Call::Sql("BEGIN TRANSACTION".to_string(), Vec::new()),
            Call::Sql("INSERT INTO t (a) VALUES (?);".to_string(), vec![Value::Int(1)]),
            Call::Sql("INSERT INTO t (a) VALUES (?)".to_string(), vec![Value::Int(2)]),
            Call::Sql(
                "INSERT INTO t (a) VALUES (?);COMMIT TRANSACTION;".to_string(),
                vec![Value::Int(3)]
            ),
        ]
    );
    assert_eq!(transaction.status(), TransactionStatus::Committed);
}

#[tokio::test]
async fn test_failed_started_commit_keeps_stack() {
    // BEGIN, immediate statement, then the failing flush
    let backend = Arc::new(MockBackend::failing_on(2));
    let mut transaction = ManagedTransaction::new(backend.clone());
    transaction.execute_immediate(&insert(1)).await.unwrap();
    transaction.add(&insert(2)).unwrap();

    assert!(transaction.commit().await.is_err());
    assert_eq!(transaction.status(), TransactionStatus::Started);
    assert_eq!(transaction.pending(), &[insert(2)]);

    // the retry goes through
    transaction.commit().await.unwrap();
    assert_eq!(transaction.status(), TransactionStatus::Committed);
}

#[tokio::test]
async fn test_rollback_open_sends_nothing() {
    let backend = Arc::new(MockBackend::new());
    let mut transaction = ManagedTransaction::new(backend.clone());
    transaction.add(&insert(1)).unwrap();
    transaction.rollback().await.unwrap();

    assert!(backend.calls().is_empty());
    assert_eq!(transaction.status(), TransactionStatus::Rollbacked);
    assert!(transaction.pending().is_empty());
}

#[tokio::test]
async fn test_rollback_started_flushes_rollback() {
    let backend = Arc::new(MockBackend::new());
    let mut transaction = ManagedTransaction::new(backend.clone());
    transaction.execute_immediate(&insert(1)).await.unwrap();
    transaction.add(&insert(2)).unwrap();
    transaction.rollback().await.unwrap();

    assert_eq!(
        backend.sql().last().map(String::as_str),
        Some("INSERT INTO t (a) VALUES (?);ROLLBACK TRANSACTION;")
    );
    assert_eq!(transaction.status(), TransactionStatus::Rollbacked);
}

#[tokio::test]
async fn test_failed_rollback_still_finishes() {
    let backend = Arc::new(MockBackend::failing_on(2));
    let mut transaction = ManagedTransaction::new(backend.clone());
    transaction.execute_immediate(&insert(1)).await.unwrap();

    assert!(transaction.rollback().await.is_err());
    assert_eq!(transaction.status(), TransactionStatus::Rollbacked);
    assert!(transaction.pending().is_empty());
}

#[tokio::test]
async fn test_finished_transaction_rejects_work() {
    let backend = Arc::new(MockBackend::new());
    let mut transaction = ManagedTransaction::new(backend.clone());
    transaction.commit().await.unwrap();

    let err = transaction.add_statement("DELETE FROM t", Vec::new()).unwrap_err();
    assert!(err.is_inactive_transaction());
    assert!(err.to_string().contains(transaction.id()));
    assert!(transaction.commit().await.unwrap_err().is_inactive_transaction());
    assert!(transaction.rollback().await.unwrap_err().is_inactive_transaction());
    assert!(transaction.savepoint("sp").unwrap_err().is_inactive_transaction());
    assert!(
        transaction
            .execute_immediate(&insert(1))
            .await
            .unwrap_err()
            .is_inactive_transaction()
    );
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_rolled_back_transaction_rejects_statements() {
    let mut transaction = ManagedTransaction::new(Arc::new(MockBackend::new()));
    transaction.rollback().await.unwrap();
    assert!(transaction.add(&insert(1)).unwrap_err().is_inactive_transaction());
}

#[tokio::test]
async fn test_savepoint_release() {
    let backend = Arc::new(MockBackend::new());
    let mut transaction = ManagedTransaction::new(backend.clone());
    transaction.add(&insert(1)).unwrap();
    transaction.savepoint("sp1").unwrap();
    transaction.add(&insert(2)).unwrap();
    assert!(backend.calls().is_empty());

    transaction.release_savepoint("sp1").await.unwrap();
    assert_eq!(transaction.status(), TransactionStatus::Released);
    assert_eq!(
        backend.calls(),
        vec![
            Call::Sql("BEGIN TRANSACTION".to_string(), Vec::new()),
            Call::Sql(
                "INSERT INTO t (a) VALUES (?);SAVEPOINT sp1;INSERT INTO t (a) VALUES (?);RELEASE SAVEPOINT sp1;"
                    .to_string(),
                vec![Value::Int(1), Value::Int(2)],
            ),
        ]
    );

    transaction.commit().await.unwrap();
    assert_eq!(backend.sql().last().map(String::as_str), Some("COMMIT TRANSACTION;"));
    assert_eq!(transaction.status(), TransactionStatus::Committed);
}

#[tokio::test]
async fn test_coordinator_serializes_commits() {
    let backend = Arc::new(MockBackend::new());
    let coordinator = CommitCoordinator::new();

    let mut first = ManagedTransaction::with_coordinator(backend.clone(), coordinator.clone());
    let mut second = ManagedTransaction::with_coordinator(backend.clone(), coordinator.clone());
    first.add(&insert(1)).unwrap();
    first.add(&insert(2)).unwrap();
    second.add(&insert(3)).unwrap();

    let slot = coordinator.acquire().await;
    let first = tokio::spawn(async move {
        first.commit().await.map(|_| first.status())
    });
    let second = tokio::spawn(async move {
        second.commit().await.map(|_| second.status())
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(coordinator.is_busy());
    // neither commit reached the backend while the slot was held
    assert!(backend.calls().is_empty());
    drop(slot);

    assert_eq!(first.await.unwrap().unwrap(), TransactionStatus::Committed);
    assert_eq!(second.await.unwrap().unwrap(), TransactionStatus::Committed);
    assert!(!coordinator.is_busy());
    assert_eq!(backend.calls().len(), 2);
}

#[tokio::test]
async fn test_started_commit_skips_coordinator() {
    let backend = Arc::new(MockBackend::new());
    let coordinator = CommitCoordinator::new();
    let mut transaction = ManagedTransaction::with_coordinator(backend.clone(), coordinator.clone());
    transaction.execute_immediate(&insert(1)).await.unwrap();

    let _slot = coordinator.acquire().await;
    tokio::time::timeout(Duration::from_secs(1), transaction.commit())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(transaction.status(), TransactionStatus::Committed);
}

#[tokio::test]
async fn test_started_transaction_holds_backend() {
    let backend = Arc::new(MockBackend::new());
    let mut transaction = ManagedTransaction::new(backend.clone());
    transaction.execute_immediate(&insert(1)).await.unwrap();

    let other = backend.clone();
    let outside = tokio::spawn(async move { other.execute_sql("DELETE FROM t", &[]).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    // the outside call waits instead of joining the transaction
    assert!(!outside.is_finished());
    assert_eq!(backend.calls().len(), 2);

    transaction.rollback().await.unwrap();
    outside.await.unwrap().unwrap();
    assert_eq!(
        backend.sql(),
        vec![
            "BEGIN TRANSACTION",
            "INSERT INTO t (a) VALUES (?)",
            "ROLLBACK TRANSACTION;",
            "DELETE FROM t",
        ]
    );
}

#[tokio::test]
async fn test_dropped_started_transaction_is_abandoned() {
    let backend = Arc::new(MockBackend::new());
    let mut transaction = ManagedTransaction::new(backend.clone());
    transaction.execute_immediate(&insert(1)).await.unwrap();
    drop(transaction);

    assert_eq!(backend.calls().last(), Some(&Call::Abandoned));
    // the session is free again
    backend.execute_sql("DELETE FROM t", &[]).await.unwrap();
    assert_eq!(backend.sql().last().map(String::as_str), Some("DELETE FROM t"));
}

#[tokio::test]
async fn test_failed_rollback_abandons_session() {
    let backend = Arc::new(MockBackend::failing_on(2));
    let mut transaction = ManagedTransaction::new(backend.clone());
    transaction.execute_immediate(&insert(1)).await.unwrap();

    assert!(transaction.rollback().await.is_err());
    assert_eq!(backend.calls().last(), Some(&Call::Abandoned));
}
