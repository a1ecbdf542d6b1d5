//! WHERE / ON predicate builder.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::ast::{Blob, Comparison, Connective, Value};
use crate::error::RowmapResult;
use crate::path::IntoPath;

use super::compiled::CompiledStatement;
use super::traits::{placeholders, qualify};

/// A column of some table alias, used on either side of a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    alias: Option<String>,
    column: String,
}

impl ColumnRef {
    pub fn new(alias: Option<&str>, path: impl IntoPath) -> RowmapResult<Self> {
        Ok(Self {
            alias: alias.map(str::to_string),
            column: path.into_path()?.column_name(),
        })
    }

    /// Reference a column by its mapped name.
    pub fn qualified(alias: &str, column: &str) -> Self {
        Self {
            alias: Some(alias.to_string()),
            column: column.to_string(),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn to_sql(&self) -> String {
        qualify(self.alias.as_deref(), &self.column)
    }
}

/// Right-hand side of a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(ColumnRef),
    Value(Value),
    Query(CompiledStatement),
}

impl Operand {
    /// Render into `out`, binding parameters in order.
    pub(crate) fn write_to(&self, out: &mut CompiledStatement) {
        match self {
            Operand::Column(column) => out.sql.push_str(&column.to_sql()),
            Operand::Value(value) => {
                let placeholder = out.bind(value.clone());
                out.sql.push_str(placeholder);
            }
            Operand::Query(query) => {
                out.sql.push('(');
                out.append(query);
                out.sql.push(')');
            }
        }
    }

    fn is_null(&self) -> bool {
        matches!(self, Operand::Value(Value::Null))
    }
}

impl From<ColumnRef> for Operand {
    fn from(column: ColumnRef) -> Self {
        Operand::Column(column)
    }
}

impl From<CompiledStatement> for Operand {
    fn from(query: CompiledStatement) -> Self {
        Operand::Query(query)
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

macro_rules! value_operand {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Operand {
                fn from(value: $ty) -> Self {
                    Operand::Value(Value::from(value))
                }
            }
        )*
    };
}

value_operand!(bool, i32, i64, u32, f64, &str, String, Decimal, DateTime<Utc>, Uuid, Blob);

impl<T: Into<Value>> From<Option<T>> for Operand {
    fn from(value: Option<T>) -> Self {
        Operand::Value(Value::from(value))
    }
}

/// Right-hand side of `IN`.
#[derive(Debug, Clone, PartialEq)]
pub enum InSet {
    Values(Vec<Value>),
    Query(CompiledStatement),
    /// No collection at all.
    Absent,
}

impl<T: Into<Value>> From<Vec<T>> for InSet {
    fn from(values: Vec<T>) -> Self {
        InSet::Values(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<Vec<T>>> for InSet {
    fn from(values: Option<Vec<T>>) -> Self {
        match values {
            Some(values) => values.into(),
            None => InSet::Absent,
        }
    }
}

impl<T: Into<Value> + Clone> From<&[T]> for InSet {
    fn from(values: &[T]) -> Self {
        InSet::Values(values.iter().cloned().map(Into::into).collect())
    }
}

impl From<CompiledStatement> for InSet {
    fn from(query: CompiledStatement) -> Self {
        InSet::Query(query)
    }
}

/// Fluent predicate builder.
///
/// `and()`, `or()` and `not()` apply to the next predicate only. The
/// connective defaults to `AND` and is never emitted before the first
/// predicate of a scope.
#[derive(Debug, Clone, Default)]
pub struct WhereBuilder {
    alias: Option<String>,
    compiled: CompiledStatement,
    pending: Option<Connective>,
    negate: bool,
}

impl WhereBuilder {
    pub fn new(alias: Option<&str>) -> Self {
        Self {
            alias: alias.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Column of this builder's table, for column-to-column comparisons.
    pub fn column(&self, path: impl IntoPath) -> RowmapResult<ColumnRef> {
        ColumnRef::new(self.alias.as_deref(), path)
    }

    pub fn not(&mut self) -> &mut Self {
        self.negate = true;
        self
    }

    pub fn and(&mut self) -> &mut Self {
        self.pending = Some(Connective::And);
        self
    }

    pub fn or(&mut self) -> &mut Self {
        self.pending = Some(Connective::Or);
        self
    }

    /// Parenthesized sub-expression with its own connective state.
    pub fn scope(
        &mut self,
        scope: impl FnOnce(&mut WhereBuilder) -> RowmapResult<()>,
    ) -> RowmapResult<&mut Self> {
        let mut inner = WhereBuilder::new(self.alias.as_deref());
        scope(&mut inner)?;
        if inner.is_empty() {
            self.pending = None;
            self.negate = false;
            return Ok(self);
        }
        let mut fragment = CompiledStatement::sql("(");
        fragment.append(&inner.compiled);
        fragment.sql.push(')');
        self.push_predicate(fragment);
        Ok(self)
    }

    /// `column = value`; a `NULL` value compiles to `IS NULL`.
    pub fn equal(&mut self, path: impl IntoPath, operand: impl Into<Operand>) -> RowmapResult<&mut Self> {
        let operand = operand.into();
        if operand.is_null() {
            return self.is_null(path);
        }
        self.compare(path, Comparison::Eq, operand)
    }

    pub fn like(&mut self, path: impl IntoPath, operand: impl Into<Operand>) -> RowmapResult<&mut Self> {
        self.compare(path, Comparison::Like, operand.into())
    }

    pub fn contains(&mut self, path: impl IntoPath, value: &str) -> RowmapResult<&mut Self> {
        self.like(path, format!("%{}%", value))
    }

    pub fn starts_with(&mut self, path: impl IntoPath, value: &str) -> RowmapResult<&mut Self> {
        self.like(path, format!("{}%", value))
    }

    pub fn ends_with(&mut self, path: impl IntoPath, value: &str) -> RowmapResult<&mut Self> {
        self.like(path, format!("%{}", value))
    }

    pub fn is_null(&mut self, path: impl IntoPath) -> RowmapResult<&mut Self> {
        let mut fragment = self.left(path)?;
        fragment.sql.push_str(" IS NULL");
        self.push_predicate(fragment);
        Ok(self)
    }

    pub fn great(&mut self, path: impl IntoPath, operand: impl Into<Operand>) -> RowmapResult<&mut Self> {
        self.compare(path, Comparison::Gt, operand.into())
    }

    pub fn great_and_equal(&mut self, path: impl IntoPath, operand: impl Into<Operand>) -> RowmapResult<&mut Self> {
        self.compare(path, Comparison::Gte, operand.into())
    }

    pub fn less(&mut self, path: impl IntoPath, operand: impl Into<Operand>) -> RowmapResult<&mut Self> {
        self.compare(path, Comparison::Lt, operand.into())
    }

    pub fn less_and_equal(&mut self, path: impl IntoPath, operand: impl Into<Operand>) -> RowmapResult<&mut Self> {
        self.compare(path, Comparison::Lte, operand.into())
    }

    /// `column BETWEEN low AND high`, inclusive.
    pub fn between(
        &mut self,
        path: impl IntoPath,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> RowmapResult<&mut Self> {
        let mut fragment = self.left(path)?;
        fragment.sql.push_str(" BETWEEN ");
        low.into().write_to(&mut fragment);
        fragment.sql.push_str(" AND ");
        high.into().write_to(&mut fragment);
        self.push_predicate(fragment);
        Ok(self)
    }

    /// Membership test. An empty set is always false, an absent one always true.
    pub fn is_in(&mut self, path: impl IntoPath, set: impl Into<InSet>) -> RowmapResult<&mut Self> {
        let left = self.left(path)?;
        let fragment = match set.into() {
            InSet::Absent => CompiledStatement::sql("1 = 1"),
            InSet::Values(values) if values.is_empty() => CompiledStatement::sql("1 = 0"),
            InSet::Values(values) => {
                let mut fragment = left;
                fragment.push(&format!(" IN ({})", placeholders(values.len())), values);
                fragment
            }
            InSet::Query(query) => {
                let mut fragment = left;
                fragment.sql.push_str(" IN (");
                fragment.append(&query);
                fragment.sql.push(')');
                fragment
            }
        };
        self.push_predicate(fragment);
        Ok(self)
    }

    /// Raw predicate text with its parameters.
    pub fn expression(&mut self, sql: &str, params: Vec<Value>) -> &mut Self {
        self.push_predicate(CompiledStatement::new(sql, params));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    /// The predicate text without the `WHERE` keyword; empty when nothing was added.
    pub fn compile(&self) -> CompiledStatement {
        self.compiled.clone()
    }

    fn left(&self, path: impl IntoPath) -> RowmapResult<CompiledStatement> {
        Ok(CompiledStatement::sql(self.column(path)?.to_sql()))
    }

    fn compare(&mut self, path: impl IntoPath, comparison: Comparison, operand: Operand) -> RowmapResult<&mut Self> {
        let mut fragment = self.left(path)?;
        fragment.sql.push(' ');
        fragment.sql.push_str(comparison.sql_symbol());
        fragment.sql.push(' ');
        operand.write_to(&mut fragment);
        self.push_predicate(fragment);
        Ok(self)
    }

    fn push_predicate(&mut self, fragment: CompiledStatement) {
        let connective = self.pending.take().unwrap_or_default();
        if !self.compiled.is_empty() {
            self.compiled.sql.push_str(&format!(" {} ", connective));
        }
        if std::mem::take(&mut self.negate) {
            self.compiled.sql.push_str("NOT ");
        }
        self.compiled.append(&fragment);
    }
}
