//! `CASE ... END` projections.

use crate::error::RowmapResult;
use crate::path::IntoPath;
use crate::transpiler::compiled::CompiledStatement;
use crate::transpiler::conditions::{Operand, WhereBuilder};
use crate::transpiler::traits::qualify;

/// Accumulates `WHEN ... THEN ...` branches and an optional `ELSE`.
///
/// ```ignore
/// p.case(|c| {
///     c.when(|w| { w.great("stock", 0)?; Ok(()) }, "available")?
///         .otherwise("sold out");
///     Ok(())
/// })?
/// .alias("availability");
/// // CASE WHEN tes.stock > ? THEN ? ELSE ? END AS availability
/// ```
#[derive(Debug, Clone)]
pub struct CaseBuilder {
    table_alias: Option<String>,
    subject: Option<String>,
    branches: CompiledStatement,
    otherwise: Option<Operand>,
}

impl CaseBuilder {
    pub fn new(table_alias: Option<&str>) -> Self {
        Self {
            table_alias: table_alias.map(str::to_string),
            subject: None,
            branches: CompiledStatement::default(),
            otherwise: None,
        }
    }

    /// Simple form: `CASE column WHEN value ...`.
    pub fn with_subject(table_alias: Option<&str>, path: impl IntoPath) -> RowmapResult<Self> {
        let mut case = Self::new(table_alias);
        let column = path.into_path()?.column_name();
        case.subject = Some(qualify(table_alias, &column));
        Ok(case)
    }

    /// Searched branch: `WHEN <predicate> THEN <result>`.
    pub fn when(
        &mut self,
        condition: impl FnOnce(&mut WhereBuilder) -> RowmapResult<()>,
        then: impl Into<Operand>,
    ) -> RowmapResult<&mut Self> {
        let mut predicate = WhereBuilder::new(self.table_alias.as_deref());
        condition(&mut predicate)?;
        self.branches.sql.push_str(" WHEN ");
        self.branches.append(&predicate.compile());
        self.push_then(then.into());
        Ok(self)
    }

    /// Simple branch: `WHEN <value> THEN <result>`.
    pub fn when_value(&mut self, value: impl Into<Operand>, then: impl Into<Operand>) -> &mut Self {
        self.branches.sql.push_str(" WHEN ");
        value.into().write_to(&mut self.branches);
        self.push_then(then.into());
        self
    }

    pub fn otherwise(&mut self, value: impl Into<Operand>) -> &mut Self {
        self.otherwise = Some(value.into());
        self
    }

    /// `None` when no branch was added.
    pub fn compile(&self) -> Option<CompiledStatement> {
        if self.branches.is_empty() {
            return None;
        }
        let mut compiled = CompiledStatement::sql("CASE");
        if let Some(subject) = &self.subject {
            compiled.sql.push(' ');
            compiled.sql.push_str(subject);
        }
        compiled.append(&self.branches);
        if let Some(otherwise) = &self.otherwise {
            compiled.sql.push_str(" ELSE ");
            otherwise.write_to(&mut compiled);
        }
        compiled.sql.push_str(" END");
        Some(compiled)
    }

    fn push_then(&mut self, then: Operand) {
        self.branches.sql.push_str(" THEN ");
        then.write_to(&mut self.branches);
    }
}
