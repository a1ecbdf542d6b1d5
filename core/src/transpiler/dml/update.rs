//! UPDATE statements.

use crate::ast::Record;
use crate::error::{RowmapError, RowmapResult};
use crate::metadata::MapperTable;
use crate::transpiler::columns::{ColumnsBuilder, ColumnsFormat};
use crate::transpiler::compiled::{CompiledStatement, SqlCompilable};
use crate::transpiler::conditions::WhereBuilder;
use crate::transpiler::traits::{PLACEHOLDER, escape_identifier};

use super::{dependency_insert, dependency_reference_column, model_key};

/// `UPDATE table SET ... [WHERE ...]`. The table is never aliased.
///
/// With a model and no explicit columns every stored column is written and
/// dependency tables are rewritten (delete by parent key, then insert).
#[derive(Debug, Clone)]
pub struct Update<'a> {
    table: &'a MapperTable,
    model: Option<&'a Record>,
    /// `None` writes every stored column of the model.
    columns: Option<ColumnsBuilder<'a>>,
    conditions: WhereBuilder,
}

impl<'a> Update<'a> {
    pub fn new(table: &'a MapperTable, model: Option<&'a Record>) -> Self {
        Self {
            table,
            model,
            columns: None,
            conditions: WhereBuilder::new(None),
        }
    }

    pub fn columns(
        &mut self,
        build: impl FnOnce(&mut ColumnsBuilder<'a>) -> RowmapResult<()>,
    ) -> RowmapResult<&mut Self> {
        let mut columns = ColumnsBuilder::new(self.table, self.model, ColumnsFormat::Update);
        build(&mut columns)?;
        self.columns = Some(columns);
        Ok(self)
    }

    pub fn filter(&mut self, build: impl FnOnce(&mut WhereBuilder) -> RowmapResult<()>) -> RowmapResult<&mut Self> {
        build(&mut self.conditions)?;
        Ok(self)
    }

    pub fn compile(&self) -> RowmapResult<Vec<CompiledStatement>> {
        let compiled = match &self.columns {
            Some(columns) => columns.compile(),
            None => {
                let mut columns = ColumnsBuilder::new(self.table, self.model, ColumnsFormat::Update);
                if self.model.is_some() {
                    columns.all_columns()?;
                }
                columns.compile()
            }
        };
        if compiled.columns.is_empty() {
            return Err(RowmapError::configuration(format!(
                "Table '{}', no columns to update",
                self.table.table_name
            )));
        }

        let mut update = CompiledStatement::new(
            format!(
                "UPDATE {} SET {}",
                escape_identifier(&self.table.table_name),
                compiled.columns.join(", ")
            ),
            compiled.params,
        );
        let conditions = self.conditions.compile();
        if !conditions.is_empty() {
            update.sql.push_str(" WHERE ");
            update.append(&conditions);
        }

        let mut statements = vec![update];
        let Some(model) = self.model else {
            return Ok(statements);
        };
        if self.columns.is_some() || self.table.dependencies.is_empty() {
            return Ok(statements);
        }

        let parent_key = model_key(self.table, model)?.ok_or_else(|| {
            RowmapError::configuration(format!(
                "Table '{}', the key value is required to update dependencies",
                self.table.table_name
            ))
        })?;
        let (_, reference) = dependency_reference_column(self.table)?;
        for dependency in &self.table.dependencies {
            statements.push(CompiledStatement::new(
                format!(
                    "DELETE FROM {} WHERE {} = {}",
                    escape_identifier(&dependency.table_name),
                    escape_identifier(&reference),
                    PLACEHOLDER
                ),
                vec![parent_key.clone()],
            ));
            if let Some(stmt) = dependency_insert(self.table, dependency, model, Some(&parent_key))? {
                statements.push(stmt);
            }
        }
        Ok(statements)
    }
}

impl SqlCompilable for Update<'_> {
    fn compile(&self) -> RowmapResult<Vec<CompiledStatement>> {
        Update::compile(self)
    }
}
