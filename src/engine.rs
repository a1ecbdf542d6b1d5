//! SQLite backend on sqlx.
//!
//! The backend owns a single connection. Plain calls lock it for one
//! statement; a lease keeps it locked for the life of a started transaction,
//! so no other caller runs inside that transaction. A lease dropped with the
//! transaction still open is rolled back before the connection is reused.

use std::sync::Arc;

use async_trait::async_trait;
use rowmap_core::ast::Value;
use rowmap_core::error::{RowmapError, RowmapResult};
use rowmap_core::transpiler::CompiledStatement;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Row as _, TypeInfo, ValueRef};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::backend::{Backend, ConnectionLease, QueryResult, Row};
use crate::transaction::commands::ROLLBACK;

/// Statement prefixes whose rows are fetched.
const ROW_RETURNING: &[&str] = &["SELECT", "WITH", "PRAGMA", "VALUES"];

struct Slot {
    conn: SqliteConnection,
    /// A lease was dropped inside a transaction.
    abandoned: bool,
}

pub struct SqlxBackend {
    slot: Arc<Mutex<Slot>>,
}

impl SqlxBackend {
    /// Connect using a sqlx SQLite URL such as `sqlite::memory:` or
    /// `sqlite://data.db?mode=rwc`.
    pub async fn connect(url: &str) -> RowmapResult<Self> {
        let conn = SqliteConnection::connect(url)
            .await
            .map_err(RowmapError::database_source)?;
        debug!(url, "connected");
        Ok(Self {
            slot: Arc::new(Mutex::new(Slot {
                conn,
                abandoned: false,
            })),
        })
    }

    /// Wait for the connection, cleaning up after an abandoned lease.
    async fn checkout(&self) -> OwnedMutexGuard<Slot> {
        let mut slot = Arc::clone(&self.slot).lock_owned().await;
        if slot.abandoned {
            slot.abandoned = false;
            match sqlx::query(ROLLBACK).execute(&mut slot.conn).await {
                Ok(_) => debug!("abandoned transaction rolled back"),
                Err(err) => warn!(error = %err, "rollback of abandoned transaction failed"),
            }
        }
        slot
    }
}

impl std::fmt::Debug for SqlxBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlxBackend").finish_non_exhaustive()
    }
}

#[async_trait]
impl Backend for SqlxBackend {
    async fn execute_sql(&self, sql: &str, params: &[Value]) -> RowmapResult<QueryResult> {
        let mut slot = self.checkout().await;
        run(&mut slot.conn, sql, params).await
    }

    async fn lease(&self) -> RowmapResult<Box<dyn ConnectionLease>> {
        let slot = self.checkout().await;
        Ok(Box::new(SqliteLease { slot }))
    }

    fn supports_batch(&self) -> bool {
        true
    }

    async fn sql_batch(&self, statements: &[CompiledStatement]) -> RowmapResult<Vec<QueryResult>> {
        let mut slot = self.checkout().await;
        let mut tx = slot.conn.begin().await.map_err(RowmapError::database_source)?;
        let mut results = Vec::with_capacity(statements.len());
        for statement in statements {
            let done = bind_values(sqlx::query(&statement.sql), &statement.params)
                .execute(&mut *tx)
                .await
                .map_err(RowmapError::database_source)?;
            results.push(QueryResult {
                rows: Vec::new(),
                rows_affected: done.rows_affected(),
                insert_id: Some(done.last_insert_rowid()).filter(|id| *id > 0),
            });
        }
        tx.commit().await.map_err(RowmapError::database_source)?;
        debug!(statements = statements.len(), "batch committed");
        Ok(results)
    }
}

/// The connection, held until dropped.
struct SqliteLease {
    slot: OwnedMutexGuard<Slot>,
}

#[async_trait]
impl ConnectionLease for SqliteLease {
    async fn execute_sql(&mut self, sql: &str, params: &[Value]) -> RowmapResult<QueryResult> {
        run(&mut self.slot.conn, sql, params).await
    }

    fn abandon(&mut self) {
        self.slot.abandoned = true;
    }
}

async fn run(conn: &mut SqliteConnection, sql: &str, params: &[Value]) -> RowmapResult<QueryResult> {
    let query = bind_values(sqlx::query(sql), params);

    if returns_rows(sql) {
        let rows = query
            .fetch_all(&mut *conn)
            .await
            .map_err(RowmapError::database_source)?;
        return Ok(QueryResult {
            rows_affected: rows.len() as u64,
            rows: rows.iter().map(decode_row).collect(),
            insert_id: None,
        });
    }

    let done = query
        .execute(&mut *conn)
        .await
        .map_err(RowmapError::database_source)?;
    Ok(QueryResult {
        rows: Vec::new(),
        rows_affected: done.rows_affected(),
        insert_id: Some(done.last_insert_rowid()).filter(|id| *id > 0),
    })
}

fn returns_rows(sql: &str) -> bool {
    let head = sql.trim_start().to_uppercase();
    ROW_RETURNING.iter().any(|prefix| head.starts_with(prefix))
}

fn bind_values<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [Value],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            // no native decimal in SQLite
            Value::Decimal(d) => query.bind(d.to_string()),
            Value::String(s) => query.bind(s.as_str()),
            Value::Date(d) => query.bind(*d),
            Value::Guid(id) => query.bind(id.hyphenated().to_string()),
            Value::Blob(bytes) => query.bind(bytes.as_slice()),
        };
    }
    query
}

fn decode_row(row: &SqliteRow) -> Row {
    let mut decoded = Row::default();
    for (index, column) in row.columns().iter().enumerate() {
        decoded.columns.push(column.name().to_string());
        decoded.values.push(decode_value(row, index));
    }
    decoded
}

/// Decode by the stored value's type, not the declared column type.
fn decode_value(row: &SqliteRow, index: usize) -> Value {
    let storage = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_string(),
        Err(_) => return Value::Null,
    };
    let decoded = match storage.as_str() {
        "INTEGER" => row.try_get::<i64, _>(index).map(Value::Int),
        "REAL" => row.try_get::<f64, _>(index).map(Value::Float),
        "BLOB" => row.try_get::<Vec<u8>, _>(index).map(Value::Blob),
        _ => row.try_get::<String, _>(index).map(Value::String),
    };
    decoded.unwrap_or(Value::Null)
}
