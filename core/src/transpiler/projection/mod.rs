//! SELECT list builder.
//!
//! Plain columns are qualified with the table alias and aliased with their
//! own name (or `{tableAlias}_{column}` in alias-prefix mode). The wildcard
//! is never aliased.

pub mod case_when;
pub mod pending;

use crate::ast::{Projection, Value};
use crate::error::RowmapResult;
use crate::metadata::MapperTable;
use crate::path::IntoPath;

use super::compiled::CompiledStatement;
use super::traits::{WILDCARD, escape_identifier, qualify};

pub use case_when::CaseBuilder;
pub use pending::{PendingProjections, wrap_all};

/// One entry of the SELECT list.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionItem {
    pub expression: String,
    pub alias: String,
    pub params: Vec<Value>,
}

impl ProjectionItem {
    pub fn to_sql(&self) -> String {
        if self.alias.is_empty() {
            self.expression.clone()
        } else {
            format!("{} AS {}", self.expression, escape_identifier(&self.alias))
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectionBuilder {
    table_alias: String,
    alias_table_prefix: bool,
    items: Vec<ProjectionItem>,
    pending: PendingProjections,
}

impl ProjectionBuilder {
    pub fn new(table_alias: &str, alias_table_prefix: bool) -> Self {
        Self {
            table_alias: table_alias.to_string(),
            alias_table_prefix,
            items: Vec::new(),
            pending: PendingProjections::default(),
        }
    }

    pub fn table_alias(&self) -> &str {
        &self.table_alias
    }

    /// `alias.*`
    pub fn all(&mut self) -> &mut Self {
        self.push_column(&[], WILDCARD, Vec::new());
        self
    }

    /// Every stored column of the table.
    pub fn all_by_map(&mut self, table: &MapperTable) -> &mut Self {
        for column in table.stored_columns() {
            self.push_column(&[], &column.name, Vec::new());
        }
        self
    }

    pub fn add(&mut self, path: impl IntoPath) -> RowmapResult<&mut Self> {
        self.wrapped(&[], path)
    }

    pub fn columns<P: IntoPath>(&mut self, paths: impl IntoIterator<Item = P>) -> RowmapResult<&mut Self> {
        for path in paths {
            self.add(path)?;
        }
        Ok(self)
    }

    pub fn sum(&mut self, path: impl IntoPath) -> RowmapResult<&mut Self> {
        self.wrapped(&[Projection::Sum], path)
    }

    pub fn max(&mut self, path: impl IntoPath) -> RowmapResult<&mut Self> {
        self.wrapped(&[Projection::Max], path)
    }

    pub fn min(&mut self, path: impl IntoPath) -> RowmapResult<&mut Self> {
        self.wrapped(&[Projection::Min], path)
    }

    pub fn avg(&mut self, path: impl IntoPath) -> RowmapResult<&mut Self> {
        self.wrapped(&[Projection::Avg], path)
    }

    pub fn count(&mut self, path: impl IntoPath) -> RowmapResult<&mut Self> {
        self.wrapped(&[Projection::Count], path)
    }

    pub fn distinct(&mut self, path: impl IntoPath) -> RowmapResult<&mut Self> {
        self.wrapped(&[Projection::Distinct], path)
    }

    /// `ROUND(AVG(col)) AS col`
    pub fn avg_round(&mut self, path: impl IntoPath) -> RowmapResult<&mut Self> {
        let column = path.into_path()?.column_name();
        let expression = wrap_all(&[Projection::Round, Projection::Avg], &self.qualify(&column));
        self.push(expression, column, Vec::new());
        Ok(self)
    }

    /// `COUNT(DISTINCT col)`, not aliased.
    pub fn count_distinct(&mut self, path: impl IntoPath) -> RowmapResult<&mut Self> {
        let column = path.into_path()?.column_name();
        let expression = Projection::Count.wrap(&format!("{} {}", Projection::Distinct, self.qualify(&column)));
        self.push(expression, String::new(), Vec::new());
        Ok(self)
    }

    /// `CAST(col AS sql_type) AS col`
    pub fn cast(&mut self, path: impl IntoPath, sql_type: &str) -> RowmapResult<&mut Self> {
        let column = path.into_path()?.column_name();
        let expression = Projection::Cast.wrap(&format!("{} AS {}", self.qualify(&column), sql_type));
        let alias = self.default_alias(&column);
        self.push(expression, alias, Vec::new());
        Ok(self)
    }

    /// `COALESCE(col, ?) AS col`, binding the default.
    pub fn coalesce(&mut self, path: impl IntoPath, default: impl Into<Value>) -> RowmapResult<&mut Self> {
        let column = path.into_path()?.column_name();
        let projections = self.pending.resolve(&[Projection::Coalesce]);
        let expression = wrap_all(&projections, &format!("{}, ?", self.qualify(&column)));
        let alias = self.default_alias(&column);
        self.push(expression, alias, vec![default.into()]);
        Ok(self)
    }

    /// Searched `CASE`. Nothing is added when no branch was given.
    pub fn case(
        &mut self,
        build: impl FnOnce(&mut CaseBuilder) -> RowmapResult<()>,
    ) -> RowmapResult<&mut Self> {
        let case = CaseBuilder::new(Some(&self.table_alias));
        self.push_case(case, build)
    }

    /// Simple `CASE col WHEN ...`.
    pub fn case_of(
        &mut self,
        path: impl IntoPath,
        build: impl FnOnce(&mut CaseBuilder) -> RowmapResult<()>,
    ) -> RowmapResult<&mut Self> {
        let case = CaseBuilder::with_subject(Some(&self.table_alias), path)?;
        self.push_case(case, build)
    }

    /// Parenthesized group: `(part part ...) AS alias`.
    ///
    /// Parts come from [`fragment`](Self::fragment) or raw operators such as
    /// `CompiledStatement::sql("+")`.
    pub fn group(&mut self, alias: &str, parts: Vec<CompiledStatement>) -> &mut Self {
        let mut joined = CompiledStatement::default();
        for part in &parts {
            if !joined.is_empty() {
                joined.sql.push(' ');
            }
            joined.append(part);
        }
        let expression = Projection::Parenthesis.wrap(joined.sql.trim());
        self.push(expression, alias.to_string(), joined.params);
        self
    }

    /// A column, optionally wrapped, without registering it.
    pub fn fragment(&self, projection: Option<Projection>, path: impl IntoPath) -> RowmapResult<CompiledStatement> {
        let column = self.qualify(&path.into_path()?.column_name());
        Ok(match projection {
            Some(projection) => CompiledStatement::sql(projection.wrap(&column)),
            None => CompiledStatement::sql(column),
        })
    }

    /// `(sub query)`, not aliased.
    pub fn sub_query(&mut self, query: &CompiledStatement) -> &mut Self {
        self.push(format!("({})", query.sql), String::new(), query.params.clone());
        self
    }

    /// Raw expression with its parameters, not qualified.
    pub fn expression(&mut self, sql: &str, params: Vec<Value>) -> &mut Self {
        self.push(sql.to_string(), String::new(), params);
        self
    }

    /// Queue projections for the next column added through [`apply`](Self::apply)
    /// or one of the aggregate helpers.
    pub fn defer(&mut self, projections: &[Projection]) -> &mut Self {
        self.pending.defer(projections);
        self
    }

    /// Add a column wrapped with `projections` plus everything deferred.
    pub fn apply(&mut self, path: impl IntoPath, projections: &[Projection]) -> RowmapResult<&mut Self> {
        self.wrapped(projections, path)
    }

    /// Replace the alias of the last projection; an empty alias removes it.
    pub fn alias(&mut self, alias: &str) -> &mut Self {
        if let Some(last) = self.items.last_mut() {
            last.alias = alias.to_string();
        }
        self
    }

    pub fn items(&self) -> &[ProjectionItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn compile(&self) -> CompiledStatement {
        let mut compiled = CompiledStatement::default();
        for item in &self.items {
            if !compiled.is_empty() {
                compiled.sql.push_str(", ");
            }
            compiled.push(&item.to_sql(), item.params.iter().cloned());
        }
        compiled
    }

    fn wrapped(&mut self, projections: &[Projection], path: impl IntoPath) -> RowmapResult<&mut Self> {
        let column = path.into_path()?.column_name();
        let projections = self.pending.resolve(projections);
        self.push_column(&projections, &column, Vec::new());
        Ok(self)
    }

    fn push_column(&mut self, projections: &[Projection], column: &str, params: Vec<Value>) {
        // COUNT(*) stays unqualified
        let core = if column == WILDCARD && !projections.is_empty() {
            WILDCARD.to_string()
        } else {
            self.qualify(column)
        };
        let expression = wrap_all(projections, &core);
        let alias = self.default_alias(column);
        self.push(expression, alias, params);
    }

    fn push_case(
        &mut self,
        mut case: CaseBuilder,
        build: impl FnOnce(&mut CaseBuilder) -> RowmapResult<()>,
    ) -> RowmapResult<&mut Self> {
        build(&mut case)?;
        if let Some(compiled) = case.compile() {
            self.push(compiled.sql, String::new(), compiled.params);
        }
        Ok(self)
    }

    fn push(&mut self, expression: String, alias: String, params: Vec<Value>) {
        self.items.push(ProjectionItem {
            expression,
            alias,
            params,
        });
    }

    fn qualify(&self, column: &str) -> String {
        qualify(Some(&self.table_alias), column)
    }

    fn default_alias(&self, column: &str) -> String {
        if column == WILDCARD {
            String::new()
        } else if self.alias_table_prefix {
            format!("{}_{}", self.table_alias, column)
        } else {
            column.to_string()
        }
    }
}
