use std::sync::Arc;

use rowmap_core::ast::Value;
use rowmap_core::error::{RowmapError, RowmapResult};
use rowmap_core::transpiler::{CompiledStatement, SqlCompilable, escape_identifier};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::{Backend, ConnectionLease, QueryResult};

use super::commands::{BEGIN, COMMIT, ROLLBACK};
use super::coordinator::CommitCoordinator;
use super::status::TransactionStatus;

/// Stack of statements committed or rolled back as a unit.
///
/// While `Open` nothing reaches the backend. `commit()` then sends the whole
/// stack atomically: as one batch when the backend supports batches, else
/// wrapped in `BEGIN`/`COMMIT` in a single call. Once started (through
/// [`execute_immediate`](Self::execute_immediate) or a savepoint release)
/// the stack is flushed as one multi-statement call with `COMMIT` appended.
///
/// A started transaction holds a [`ConnectionLease`] until it finishes, so
/// other callers of the same backend wait for it instead of joining it. Do
/// not use the backend from the same task while a transaction is started.
pub struct ManagedTransaction {
    id: String,
    status: TransactionStatus,
    stack: Vec<CompiledStatement>,
    backend: Arc<dyn Backend>,
    coordinator: Option<CommitCoordinator>,
    lease: Option<Box<dyn ConnectionLease>>,
}

impl ManagedTransaction {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let id = format!("transaction_{}", Uuid::new_v4().to_string().replace('-', "_"));
        debug!(id = %id, "transaction opened");
        Self {
            id,
            status: TransactionStatus::Open,
            stack: Vec::new(),
            backend,
            coordinator: None,
            lease: None,
        }
    }

    /// Commits of every transaction sharing `coordinator` run one at a time.
    pub fn with_coordinator(backend: Arc<dyn Backend>, coordinator: CommitCoordinator) -> Self {
        let mut transaction = Self::new(backend);
        transaction.coordinator = Some(coordinator);
        transaction
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Statements not sent yet.
    pub fn pending(&self) -> &[CompiledStatement] {
        &self.stack
    }

    pub fn add_statement(&mut self, sql: impl Into<String>, params: Vec<Value>) -> RowmapResult<()> {
        self.check_active()?;
        self.stack.push(CompiledStatement::new(sql, params));
        Ok(())
    }

    /// Compile and stack every statement of `compilable`, parent first.
    pub fn add(&mut self, compilable: &impl SqlCompilable) -> RowmapResult<()> {
        self.check_active()?;
        let statements = compilable.compile()?;
        self.stack.extend(statements);
        Ok(())
    }

    /// Start the backend transaction, flush the stack, then run `compilable`
    /// right away and return its results.
    pub async fn execute_immediate(&mut self, compilable: &impl SqlCompilable) -> RowmapResult<Vec<QueryResult>> {
        self.check_active()?;
        let statements = compilable.compile()?;
        self.begin().await?;
        self.execute_stack().await?;

        let mut results = Vec::with_capacity(statements.len());
        for statement in &statements {
            results.push(self.send(&statement.sql, &statement.params).await?);
        }
        Ok(results)
    }

    /// Stack `SAVEPOINT name`.
    pub fn savepoint(&mut self, name: &str) -> RowmapResult<()> {
        self.add_statement(format!("SAVEPOINT {}", escape_identifier(name)), Vec::new())
    }

    /// Start the transaction if needed and flush the stack up to
    /// `RELEASE SAVEPOINT name`.
    pub async fn release_savepoint(&mut self, name: &str) -> RowmapResult<()> {
        self.check_active()?;
        self.begin().await?;
        self.stack.push(CompiledStatement::sql(format!(
            "RELEASE SAVEPOINT {}",
            escape_identifier(name)
        )));
        if let Err(err) = self.execute_stack().await {
            self.stack.pop();
            return Err(err);
        }
        self.status = TransactionStatus::Released;
        debug!(id = %self.id, savepoint = name, "savepoint released");
        Ok(())
    }

    /// Send what is pending and finish. Open commits sharing a coordinator
    /// run one at a time; a started transaction already owns the session and
    /// commits without waiting for the coordinator.
    pub async fn commit(&mut self) -> RowmapResult<()> {
        self.check_active()?;
        let coordinator = self.coordinator.clone().filter(|_| !self.status.is_started());
        let _slot = match &coordinator {
            Some(coordinator) => Some(coordinator.acquire().await),
            None => None,
        };
        // another commit may have finished this transaction while we waited
        self.check_active()?;

        if self.status.is_started() {
            self.stack.push(CompiledStatement::sql(COMMIT));
            if let Err(err) = self.execute_stack().await {
                self.stack.pop();
                warn!(id = %self.id, error = %err, "commit failed");
                return Err(err);
            }
        } else if !self.stack.is_empty() {
            self.commit_open().await?;
        }

        self.finish(TransactionStatus::Committed);
        Ok(())
    }

    /// Roll back what reached the backend. Always ends `Rollbacked` with an
    /// empty stack; a backend failure is still returned.
    pub async fn rollback(&mut self) -> RowmapResult<()> {
        self.check_active()?;
        let mut outcome = Ok(());
        if self.status.is_started() {
            self.stack.push(CompiledStatement::sql(ROLLBACK));
            if let Err(err) = self.execute_stack().await {
                warn!(id = %self.id, error = %err, "rollback failed");
                if let Some(lease) = self.lease.as_mut() {
                    lease.abandon();
                }
                outcome = Err(err);
            }
        }
        self.finish(TransactionStatus::Rollbacked);
        outcome
    }

    async fn commit_open(&mut self) -> RowmapResult<()> {
        if self.backend.supports_batch() {
            self.backend.sql_batch(&self.stack).await.map_err(|err| {
                warn!(id = %self.id, error = %err, "batch commit failed");
                err
            })?;
            return Ok(());
        }

        let mut statements = Vec::with_capacity(self.stack.len() + 2);
        statements.push(CompiledStatement::sql(BEGIN));
        statements.extend(self.stack.iter().cloned());
        statements.push(CompiledStatement::sql(COMMIT));
        let flushed = flatten(&statements);
        let mut lease = self.backend.lease().await?;
        if let Err(err) = lease.execute_sql(&flushed.sql, &flushed.params).await {
            warn!(id = %self.id, error = %err, "commit failed");
            // leave the connection outside of a transaction
            if let Err(rollback) = lease.execute_sql(ROLLBACK, &[]).await {
                debug!(id = %self.id, error = %rollback, "nothing to roll back");
            }
            return Err(err);
        }
        Ok(())
    }

    async fn begin(&mut self) -> RowmapResult<()> {
        if self.status != TransactionStatus::Open {
            return Ok(());
        }
        let mut lease = self.backend.lease().await?;
        lease.execute_sql(BEGIN, &[]).await?;
        self.lease = Some(lease);
        self.status = TransactionStatus::Started;
        debug!(id = %self.id, "transaction started");
        Ok(())
    }

    /// Send the stack as one call; it is cleared only on success.
    async fn execute_stack(&mut self) -> RowmapResult<()> {
        if self.stack.is_empty() {
            return Ok(());
        }
        let flushed = flatten(&self.stack);
        self.send(&flushed.sql, &flushed.params).await?;
        self.stack.clear();
        Ok(())
    }

    /// Through the lease once started, else straight to the backend.
    async fn send(&mut self, sql: &str, params: &[Value]) -> RowmapResult<QueryResult> {
        match self.lease.as_mut() {
            Some(lease) => lease.execute_sql(sql, params).await,
            None => self.backend.execute_sql(sql, params).await,
        }
    }

    fn finish(&mut self, status: TransactionStatus) {
        self.status = status;
        self.stack.clear();
        self.lease = None;
        debug!(id = %self.id, %status, "transaction finished");
    }

    fn check_active(&self) -> RowmapResult<()> {
        if self.status.is_active() {
            Ok(())
        } else {
            Err(RowmapError::InactiveTransaction { id: self.id.clone() })
        }
    }
}

impl std::fmt::Debug for ManagedTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedTransaction")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("pending", &self.stack.len())
            .finish_non_exhaustive()
    }
}

impl Drop for ManagedTransaction {
    fn drop(&mut self) {
        if self.status.is_started() {
            if let Some(lease) = self.lease.as_mut() {
                lease.abandon();
            }
            warn!(id = %self.id, "transaction dropped while started, rolled back before the session is reused");
        }
    }
}

/// Join statements as `a;b;` with their params in order.
fn flatten(statements: &[CompiledStatement]) -> CompiledStatement {
    let mut flushed = CompiledStatement::default();
    for statement in statements {
        flushed.append(statement);
        flushed.sql.push(';');
    }
    flushed
}
