//! DELETE statements.

use crate::error::RowmapResult;
use crate::metadata::MapperTable;
use crate::transpiler::compiled::{CompiledStatement, SqlCompilable};
use crate::transpiler::conditions::WhereBuilder;
use crate::transpiler::traits::escape_identifier;

use super::dependency_reference_column;

/// `DELETE FROM table [WHERE ...]`.
///
/// Dependency rows go first, selected through the parent's filter.
#[derive(Debug, Clone)]
pub struct Delete<'a> {
    table: &'a MapperTable,
    conditions: WhereBuilder,
}

impl<'a> Delete<'a> {
    pub fn new(table: &'a MapperTable) -> Self {
        Self {
            table,
            conditions: WhereBuilder::new(None),
        }
    }

    pub fn filter(&mut self, build: impl FnOnce(&mut WhereBuilder) -> RowmapResult<()>) -> RowmapResult<&mut Self> {
        build(&mut self.conditions)?;
        Ok(self)
    }

    pub fn compile(&self) -> RowmapResult<Vec<CompiledStatement>> {
        let table_name = escape_identifier(&self.table.table_name);
        let conditions = self.conditions.compile();
        let mut statements = Vec::with_capacity(self.table.dependencies.len() + 1);

        if !self.table.dependencies.is_empty() {
            let (key, reference) = dependency_reference_column(self.table)?;
            for dependency in &self.table.dependencies {
                let mut stmt = CompiledStatement::sql(format!(
                    "DELETE FROM {} WHERE {} IN (SELECT {} FROM {}",
                    escape_identifier(&dependency.table_name),
                    escape_identifier(&reference),
                    escape_identifier(&key),
                    table_name
                ));
                if !conditions.is_empty() {
                    stmt.sql.push_str(" WHERE ");
                    stmt.append(&conditions);
                }
                stmt.sql.push(')');
                statements.push(stmt);
            }
        }

        let mut delete = CompiledStatement::sql(format!("DELETE FROM {}", table_name));
        if !conditions.is_empty() {
            delete.sql.push_str(" WHERE ");
            delete.append(&conditions);
        }
        statements.push(delete);
        Ok(statements)
    }
}

impl SqlCompilable for Delete<'_> {
    fn compile(&self) -> RowmapResult<Vec<CompiledStatement>> {
        Delete::compile(self)
    }
}
