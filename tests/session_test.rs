mod common;

use std::sync::Arc;

use common::{Call, MockBackend, Memo, brand, post, registry};
use pretty_assertions::assert_eq;
use rowmap::prelude::*;

fn session(backend: &Arc<MockBackend>, config: RowmapConfig) -> Session {
    Session::new(backend.clone(), registry(), config)
}

#[tokio::test]
async fn test_insert_with_dependencies_runs_in_transaction() {
    let backend = Arc::new(MockBackend::new());
    let session = session(&backend, RowmapConfig::default());
    session.insert(&brand(1, "Acme", &["x", "y"])).await.unwrap();

    assert_eq!(
        backend.calls(),
        vec![
            Call::Sql("BEGIN TRANSACTION".to_string(), Vec::new()),
            Call::Sql(
                "INSERT INTO Brand (id, name) VALUES (?, ?)".to_string(),
                vec![Value::Int(1), Value::from("Acme")],
            ),
            Call::Sql(
                "INSERT INTO Brand_tags (\"index\", value, Brand_id) VALUES (?, ?, ?), (?, ?, ?)".to_string(),
                vec![
                    Value::Int(0),
                    Value::from("x"),
                    Value::Int(1),
                    Value::Int(1),
                    Value::from("y"),
                    Value::Int(1),
                ],
            ),
            Call::Sql("COMMIT TRANSACTION;".to_string(), Vec::new()),
        ]
    );
}

#[tokio::test]
async fn test_single_statement_skips_transaction() {
    let backend = Arc::new(MockBackend::new());
    let session = session(&backend, RowmapConfig::default());
    session.insert(&brand(1, "Acme", &[])).await.unwrap();

    assert_eq!(backend.sql(), vec!["INSERT INTO Brand (id, name) VALUES (?, ?)"]);
}

#[tokio::test]
async fn test_failed_statement_rolls_back() {
    // BEGIN, parent insert, failing dependency insert
    let backend = Arc::new(MockBackend::failing_on(2));
    let session = session(&backend, RowmapConfig::default());
    let err = session.insert(&brand(1, "Acme", &["x"])).await.unwrap_err();

    assert!(matches!(err, RowmapError::Database { .. }));
    assert_eq!(backend.sql().last().map(String::as_str), Some("ROLLBACK TRANSACTION;"));
}

#[tokio::test]
async fn test_generated_key_insert_needs_reported_id() {
    // the recorder reports no insert id
    let backend = Arc::new(MockBackend::new());
    let session = session(&backend, RowmapConfig::default());
    let err = session.insert(&post("first", &["a"])).await.unwrap_err();

    assert!(err.is_configuration());
    assert_eq!(
        backend.sql(),
        vec![
            "BEGIN TRANSACTION",
            "INSERT INTO Post (title) VALUES (?)",
            "ROLLBACK TRANSACTION;",
        ]
    );
}

#[tokio::test]
async fn test_update_filters_by_key() {
    let backend = Arc::new(MockBackend::new());
    let session = session(&backend, RowmapConfig::default());
    session.update(&brand(4, "Renamed", &["z"])).await.unwrap();

    assert_eq!(
        backend.sql(),
        vec![
            "BEGIN TRANSACTION",
            "UPDATE Brand SET id = ?, name = ? WHERE id = ?",
            "DELETE FROM Brand_tags WHERE Brand_id = ?",
            "INSERT INTO Brand_tags (\"index\", value, Brand_id) VALUES (?, ?, ?)",
            "COMMIT TRANSACTION;",
        ]
    );
}

#[tokio::test]
async fn test_delete_removes_dependents_first() {
    let backend = Arc::new(MockBackend::new());
    let session = session(&backend, RowmapConfig::default());
    session.delete(&brand(4, "Acme", &[])).await.unwrap();

    assert_eq!(
        backend.calls()[1..3].to_vec(),
        vec![
            Call::Sql(
                "DELETE FROM Brand_tags WHERE Brand_id IN (SELECT id FROM Brand WHERE id = ?)".to_string(),
                vec![Value::Int(4)],
            ),
            Call::Sql("DELETE FROM Brand WHERE id = ?".to_string(), vec![Value::Int(4)]),
        ]
    );
}

#[tokio::test]
async fn test_unmapped_model_fails() {
    let backend = Arc::new(MockBackend::new());
    let session = Session::new(backend.clone(), MapperRegistry::builder().build(), RowmapConfig::default());
    let err = session.update(&Memo::default()).await.unwrap_err();

    assert!(err.is_configuration());
    assert!(err.to_string().contains("'Memo' is not registered"));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_query_requires_mapped_type() {
    let backend = Arc::new(MockBackend::new());
    let session = session(&backend, RowmapConfig::default());

    assert!(session.query("Missing").unwrap_err().is_configuration());
    let query = session.query_for::<Memo>().unwrap();
    assert_eq!(query.table_name(), "Memo");
    assert_eq!(query.alias(), "mem");
}

#[tokio::test]
async fn test_query_honors_alias_table_prefix() {
    let backend = Arc::new(MockBackend::new());
    let config = RowmapConfig::builder().alias_table_prefix(true).build();
    let session = session(&backend, config);

    let mut query = session.query_for::<Memo>().unwrap();
    query
        .select(|s| {
            s.add("text")?;
            Ok(())
        })
        .unwrap();
    session.fetch(&query).await.unwrap();

    assert_eq!(backend.sql(), vec!["SELECT mem.text AS mem_text FROM Memo AS mem"]);
}

#[tokio::test]
async fn test_create_and_drop_table() {
    let backend = Arc::new(MockBackend::new());
    let session = session(&backend, RowmapConfig::default());
    session.create_table::<Memo>().await.unwrap();
    session.drop_table::<common::Brand>().await.unwrap();

    assert_eq!(
        backend.sql(),
        vec![
            "CREATE TABLE IF NOT EXISTS Memo (id INTEGER PRIMARY KEY AUTOINCREMENT, text TEXT)",
            "DROP TABLE IF EXISTS Brand_tags",
            "DROP TABLE IF EXISTS Brand",
        ]
    );
}
