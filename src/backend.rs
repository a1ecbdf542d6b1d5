//! Storage backend capability.
//!
//! A backend runs parameterized SQL. Backends that can run several
//! statements atomically in one call advertise it through
//! [`Backend::supports_batch`] and implement [`Backend::sql_batch`].
//!
//! A started transaction needs every statement on one session with nothing
//! else in between, so it runs through a [`ConnectionLease`] taken with
//! [`Backend::lease`]. Other callers wait until the lease is dropped.

use async_trait::async_trait;
use rowmap_core::ast::Value;
use rowmap_core::error::{RowmapError, RowmapResult};
use rowmap_core::transpiler::CompiledStatement;

/// One result row: column names with their values, in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub columns: Vec<String>,
    pub values: Vec<Value>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|index| self.values.get(index))
    }
}

/// Outcome of one execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub rows_affected: u64,
    /// Row id of the last inserted row, when the backend reports one.
    pub insert_id: Option<i64>,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Run `sql`, which may hold several `;`-separated statements, binding
    /// `params` to the `?` placeholders in order.
    async fn execute_sql(&self, sql: &str, params: &[Value]) -> RowmapResult<QueryResult>;

    /// Take the session for exclusive use until the lease is dropped.
    async fn lease(&self) -> RowmapResult<Box<dyn ConnectionLease>>;

    fn supports_batch(&self) -> bool {
        false
    }

    /// Run every statement atomically.
    async fn sql_batch(&self, statements: &[CompiledStatement]) -> RowmapResult<Vec<QueryResult>> {
        let _ = statements;
        Err(RowmapError::configuration("backend does not support batch execution"))
    }
}

/// Exclusive hold on a backend session.
#[async_trait]
pub trait ConnectionLease: Send {
    async fn execute_sql(&mut self, sql: &str, params: &[Value]) -> RowmapResult<QueryResult>;

    /// The session is left inside a transaction; the backend rolls it back
    /// before the next caller gets it.
    fn abandon(&mut self);
}
