//! Entry point tying the registry, a backend and the configuration together.

use std::sync::Arc;

use rowmap_core::ast::{FieldValue, Model, Record, Value};
use rowmap_core::error::{RowmapError, RowmapResult};
use rowmap_core::metadata::{MapperRegistry, MapperTable};
use rowmap_core::path::PropertyPath;
use rowmap_core::transpiler::{CreateTable, Delete, DropTable, Insert, Query, SqlCompilable, Update};
use tracing::{debug, warn};

use crate::backend::{Backend, QueryResult, Row};
use crate::config::RowmapConfig;
use crate::engine::SqlxBackend;
use crate::transaction::{CommitCoordinator, ManagedTransaction};

/// Shared handle for running mapped statements.
///
/// Clones share the backend, the registry and the commit coordinator.
#[derive(Clone)]
pub struct Session {
    backend: Arc<dyn Backend>,
    registry: Arc<MapperRegistry>,
    config: RowmapConfig,
    coordinator: CommitCoordinator,
}

impl Session {
    pub fn new(backend: Arc<dyn Backend>, registry: MapperRegistry, config: RowmapConfig) -> Self {
        Self {
            backend,
            registry: Arc::new(registry),
            config,
            coordinator: CommitCoordinator::new(),
        }
    }

    /// Open the SQLite backend named by `config.database_url`.
    pub async fn connect(registry: MapperRegistry, config: RowmapConfig) -> RowmapResult<Self> {
        let backend = SqlxBackend::connect(&config.database_url).await?;
        Ok(Self::new(Arc::new(backend), registry, config))
    }

    pub fn registry(&self) -> &MapperRegistry {
        &self.registry
    }

    pub fn config(&self) -> &RowmapConfig {
        &self.config
    }

    pub fn backend(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.backend)
    }

    pub fn transaction(&self) -> ManagedTransaction {
        if self.config.single_flight_commit {
            ManagedTransaction::with_coordinator(self.backend(), self.coordinator.clone())
        } else {
            ManagedTransaction::new(self.backend())
        }
    }

    pub fn table(&self, type_name: &str) -> RowmapResult<&MapperTable> {
        self.registry.require(type_name)
    }

    pub fn table_for<M: Model>(&self) -> RowmapResult<&MapperTable> {
        self.registry.get_for::<M>()
    }

    /// Query on a mapped table, honoring `alias_table_prefix`.
    pub fn query(&self, type_name: &str) -> RowmapResult<Query> {
        let table = self.table(type_name)?;
        Ok(Query::new(&table.table_name).alias_table_prefix(self.config.alias_table_prefix))
    }

    pub fn query_for<M: Model>(&self) -> RowmapResult<Query> {
        self.query(M::type_name())
    }

    /// Run a query and return its rows.
    pub async fn fetch(&self, query: &Query) -> RowmapResult<Vec<Row>> {
        let mut results = self.execute(query).await?;
        Ok(results.pop().map(|result| result.rows).unwrap_or_default())
    }

    /// Run every compiled statement in order, outside of a transaction.
    pub async fn execute(&self, compilable: &impl SqlCompilable) -> RowmapResult<Vec<QueryResult>> {
        let statements = compilable.compile()?;
        let mut results = Vec::with_capacity(statements.len());
        for statement in &statements {
            if self.config.log_statements {
                debug!(sql = %statement.sql, params = ?statement.params, "execute");
            }
            results.push(self.backend.execute_sql(&statement.sql, &statement.params).await?);
        }
        Ok(results)
    }

    /// Run the statements inside one transaction; rolled back on failure.
    pub async fn execute_atomic(&self, compilable: &impl SqlCompilable) -> RowmapResult<Vec<QueryResult>> {
        let statements = compilable.compile()?;
        if statements.len() == 1 {
            return self.execute(&statements).await;
        }

        let mut transaction = self.transaction();
        let outcome = transaction.execute_immediate(&statements).await;
        finish(transaction, outcome).await
    }

    /// Insert the model and its dependency rows.
    ///
    /// With an auto increment key the parent row is stored first and its
    /// dependency rows are bound to the id the backend assigned.
    pub async fn insert<M: Model>(&self, model: &M) -> RowmapResult<Vec<QueryResult>> {
        let table = self.table_for::<M>()?;
        let record = model.to_record();
        let insert = Insert::new(table, &record);
        if !insert.needs_generated_key()? {
            return self.execute_atomic(&insert).await;
        }

        let parent = insert.compile_parent()?;
        let mut transaction = self.transaction();
        let outcome = async {
            let mut results = transaction.execute_immediate(&parent).await?;
            let id = results.first().and_then(|result| result.insert_id).ok_or_else(|| {
                RowmapError::configuration(format!(
                    "Table '{}', the backend reported no generated key",
                    table.table_name
                ))
            })?;
            debug!(table = %table.table_name, id, "generated key");
            let dependencies = insert.compile_dependencies(Some(&Value::Int(id)))?;
            results.extend(transaction.execute_immediate(&dependencies).await?);
            Ok::<_, RowmapError>(results)
        }
        .await;
        finish(transaction, outcome).await
    }

    /// Rewrite every column of the row matching the model's key.
    pub async fn update<M: Model>(&self, model: &M) -> RowmapResult<Vec<QueryResult>> {
        let table = self.table_for::<M>()?;
        let record = model.to_record();
        let (column, key) = key_of(table, &record)?;
        let mut update = Update::new(table, Some(&record));
        update.filter(|w| {
            w.equal(column.as_str(), key)?;
            Ok(())
        })?;
        self.execute_atomic(&update).await
    }

    /// Delete the row matching the model's key and its dependency rows.
    pub async fn delete<M: Model>(&self, model: &M) -> RowmapResult<Vec<QueryResult>> {
        let table = self.table_for::<M>()?;
        let record = model.to_record();
        let (column, key) = key_of(table, &record)?;
        let mut delete = Delete::new(table);
        delete.filter(|w| {
            w.equal(column.as_str(), key)?;
            Ok(())
        })?;
        self.execute_atomic(&delete).await
    }

    pub async fn create_table<M: Model>(&self) -> RowmapResult<Vec<QueryResult>> {
        let table = self.table_for::<M>()?;
        self.execute(&CreateTable::new(table)).await
    }

    pub async fn drop_table<M: Model>(&self) -> RowmapResult<Vec<QueryResult>> {
        let table = self.table_for::<M>()?;
        self.execute(&DropTable::new(table)).await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("tables", &self.registry.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Commit when `outcome` is ok, else roll back and return the original error.
async fn finish(
    mut transaction: ManagedTransaction,
    outcome: RowmapResult<Vec<QueryResult>>,
) -> RowmapResult<Vec<QueryResult>> {
    match outcome {
        Ok(results) => {
            transaction.commit().await?;
            Ok(results)
        }
        Err(err) => {
            if let Err(rollback) = transaction.rollback().await {
                warn!(error = %rollback, "rollback after failed statement failed");
            }
            Err(err)
        }
    }
}

/// Key column name and the model's value for it.
fn key_of(table: &MapperTable, record: &Record) -> RowmapResult<(String, Value)> {
    let key = table.single_key()?;
    let path = PropertyPath::parse(key.reference_path())?;
    let value = record
        .value_at(&path)
        .map(FieldValue::to_bind_value)
        .transpose()?
        .filter(|value| !value.is_null())
        .ok_or_else(|| {
            RowmapError::configuration(format!(
                "Table '{}', the model has no value for key '{}'",
                table.table_name, key.name
            ))
        })?;
    Ok((key.name.clone(), value))
}
