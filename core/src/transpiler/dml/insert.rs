//! INSERT statements.

use crate::ast::{PrimaryKeyType, Record, Value};
use crate::error::{RowmapError, RowmapResult};
use crate::metadata::MapperTable;
use crate::transpiler::columns::{ColumnsBuilder, ColumnsFormat};
use crate::transpiler::compiled::{CompiledStatement, SqlCompilable};
use crate::transpiler::traits::{escape_identifier, placeholders};

use super::{dependency_insert, dependency_items, model_key};

/// `INSERT INTO table (...) VALUES (...)` for one model.
///
/// All stored columns are emitted unless [`columns`](Self::columns) narrows
/// them. Dependency lists are only written with all columns.
///
/// When the key is auto increment its value only exists once the parent row
/// is stored, so a model with dependency rows cannot be compiled in one go:
/// run [`compile_parent`](Self::compile_parent) first and pass the reported
/// id to [`compile_dependencies`](Self::compile_dependencies).
#[derive(Debug, Clone)]
pub struct Insert<'a> {
    table: &'a MapperTable,
    model: &'a Record,
    /// `None` writes every stored column.
    columns: Option<ColumnsBuilder<'a>>,
}

impl<'a> Insert<'a> {
    pub fn new(table: &'a MapperTable, model: &'a Record) -> Self {
        Self {
            table,
            model,
            columns: None,
        }
    }

    /// Emit only the columns set by `build`.
    pub fn columns(
        &mut self,
        build: impl FnOnce(&mut ColumnsBuilder<'a>) -> RowmapResult<()>,
    ) -> RowmapResult<&mut Self> {
        let mut columns = ColumnsBuilder::new(self.table, Some(self.model), ColumnsFormat::Insert);
        build(&mut columns)?;
        self.columns = Some(columns);
        Ok(self)
    }

    pub fn table(&self) -> &MapperTable {
        self.table
    }

    /// True when dependency rows must wait for the backend to assign the key.
    pub fn needs_generated_key(&self) -> RowmapResult<bool> {
        if self.columns.is_some() || !self.has_auto_increment_key() {
            return Ok(false);
        }
        for dependency in &self.table.dependencies {
            if dependency_items(self.table, dependency, self.model)?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn compile(&self) -> RowmapResult<Vec<CompiledStatement>> {
        if self.needs_generated_key()? {
            return Err(RowmapError::configuration(format!(
                "Table '{}', the auto increment key is assigned on insert; store the row before its dependencies",
                self.table.table_name
            )));
        }

        let columns = self.collect()?;
        let mut statements = vec![self.parent_statement(&columns)];
        if self.columns.is_some() || self.table.dependencies.is_empty() {
            return Ok(statements);
        }

        // generated keys win over the model value
        let key = self.table.single_key()?;
        let parent_key = match columns.value_of(&key.name).filter(|v| !v.is_null()) {
            Some(value) => Some(value.clone()),
            None => model_key(self.table, self.model)?,
        };
        statements.extend(self.compile_dependencies(parent_key.as_ref())?);
        Ok(statements)
    }

    /// The INSERT into the table itself.
    pub fn compile_parent(&self) -> RowmapResult<CompiledStatement> {
        let columns = self.collect()?;
        Ok(self.parent_statement(&columns))
    }

    /// One multi-row INSERT per non-empty dependency list, bound to `parent_key`.
    pub fn compile_dependencies(&self, parent_key: Option<&Value>) -> RowmapResult<Vec<CompiledStatement>> {
        let mut statements = Vec::new();
        if self.columns.is_some() {
            return Ok(statements);
        }
        for dependency in &self.table.dependencies {
            if let Some(stmt) = dependency_insert(self.table, dependency, self.model, parent_key)? {
                statements.push(stmt);
            }
        }
        Ok(statements)
    }

    fn has_auto_increment_key(&self) -> bool {
        self.table
            .key_columns()
            .iter()
            .any(|key| key.primary_key_type == Some(PrimaryKeyType::AutoIncrement))
    }

    fn collect(&self) -> RowmapResult<ColumnsBuilder<'a>> {
        if let Some(columns) = &self.columns {
            return Ok(columns.clone());
        }
        let mut columns = ColumnsBuilder::new(self.table, Some(self.model), ColumnsFormat::Insert);
        columns.all_columns()?;
        Ok(columns)
    }

    fn parent_statement(&self, columns: &ColumnsBuilder<'_>) -> CompiledStatement {
        let compiled = columns.compile();
        let table_name = escape_identifier(&self.table.table_name);
        if compiled.columns.is_empty() {
            return CompiledStatement::sql(format!("INSERT INTO {} DEFAULT VALUES", table_name));
        }
        CompiledStatement::new(
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table_name,
                compiled.columns.join(", "),
                placeholders(compiled.params.len())
            ),
            compiled.params,
        )
    }
}

impl SqlCompilable for Insert<'_> {
    fn compile(&self) -> RowmapResult<Vec<CompiledStatement>> {
        Insert::compile(self)
    }
}
