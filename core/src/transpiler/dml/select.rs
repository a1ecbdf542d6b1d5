//! SELECT statements.

use crate::ast::{JoinType, Model, SortOrder};
use crate::error::RowmapResult;
use crate::path::IntoPath;
use crate::transpiler::compiled::{CompiledStatement, SqlCompilable};
use crate::transpiler::conditions::{ColumnRef, WhereBuilder};
use crate::transpiler::projection::ProjectionBuilder;
use crate::transpiler::traits::{WILDCARD, escape_identifier, qualify};

/// Default table alias: the first three characters of the table name, lowercased.
pub fn default_alias(table_name: &str) -> String {
    table_name.chars().take(3).collect::<String>().to_lowercase()
}

#[derive(Debug, Clone)]
struct Join {
    join_type: JoinType,
    table_name: String,
    alias: String,
    on: CompiledStatement,
    projection: CompiledStatement,
}

/// `SELECT` builder.
///
/// Without projections the query selects `alias.*`.
#[derive(Debug, Clone)]
pub struct Query {
    table_name: String,
    alias: String,
    alias_table_prefix: bool,
    from: Option<CompiledStatement>,
    projection: ProjectionBuilder,
    conditions: WhereBuilder,
    joins: Vec<Join>,
    group_by: Vec<String>,
    order_by: Vec<(String, SortOrder)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Query {
    pub fn new(table_name: &str) -> Self {
        Self::with_alias(table_name, &default_alias(table_name))
    }

    pub fn for_model<M: Model>() -> Self {
        Self::new(M::type_name())
    }

    pub fn with_alias(table_name: &str, alias: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            alias: alias.to_string(),
            alias_table_prefix: false,
            from: None,
            projection: ProjectionBuilder::new(alias, false),
            conditions: WhereBuilder::new(Some(alias)),
            joins: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Alias projected columns as `{alias}_{column}`. Resets earlier projections.
    pub fn alias_table_prefix(mut self, enabled: bool) -> Self {
        self.alias_table_prefix = enabled;
        self.projection = ProjectionBuilder::new(&self.alias, enabled);
        self
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Column of this query's table, for join conditions.
    pub fn column_ref(&self, path: impl IntoPath) -> RowmapResult<ColumnRef> {
        ColumnRef::new(Some(&self.alias), path)
    }

    /// Select from a sub query instead of the table.
    pub fn from_query(&mut self, query: CompiledStatement) -> &mut Self {
        self.from = Some(query);
        self
    }

    pub fn select(
        &mut self,
        build: impl FnOnce(&mut ProjectionBuilder) -> RowmapResult<()>,
    ) -> RowmapResult<&mut Self> {
        build(&mut self.projection)?;
        Ok(self)
    }

    pub fn filter(&mut self, build: impl FnOnce(&mut WhereBuilder) -> RowmapResult<()>) -> RowmapResult<&mut Self> {
        build(&mut self.conditions)?;
        Ok(self)
    }

    /// Join another table. The ON builder and the projection builder both
    /// work on the joined table's alias.
    pub fn join(
        &mut self,
        table_name: &str,
        alias: Option<&str>,
        join_type: JoinType,
        on: impl FnOnce(&mut WhereBuilder) -> RowmapResult<()>,
        select: impl FnOnce(&mut ProjectionBuilder) -> RowmapResult<()>,
    ) -> RowmapResult<&mut Self> {
        let alias = match alias {
            Some(alias) => alias.to_string(),
            None => self.unique_alias(table_name),
        };
        let mut conditions = WhereBuilder::new(Some(&alias));
        on(&mut conditions)?;
        let mut projection = ProjectionBuilder::new(&alias, self.alias_table_prefix);
        select(&mut projection)?;
        self.joins.push(Join {
            join_type,
            table_name: table_name.to_string(),
            alias,
            on: conditions.compile(),
            projection: projection.compile(),
        });
        Ok(self)
    }

    pub fn group_by(&mut self, path: impl IntoPath) -> RowmapResult<&mut Self> {
        let column = path.into_path()?.column_name();
        self.group_by.push(qualify(Some(&self.alias), &column));
        Ok(self)
    }

    pub fn order_by(&mut self, path: impl IntoPath, order: SortOrder) -> RowmapResult<&mut Self> {
        let column = path.into_path()?.column_name();
        self.order_by.push((qualify(Some(&self.alias), &column), order));
        Ok(self)
    }

    pub fn asc(&mut self, path: impl IntoPath) -> RowmapResult<&mut Self> {
        self.order_by(path, SortOrder::Asc)
    }

    pub fn desc(&mut self, path: impl IntoPath) -> RowmapResult<&mut Self> {
        self.order_by(path, SortOrder::Desc)
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    /// Projection params, then the FROM sub query, joins and WHERE, matching text order.
    pub fn compile(&self) -> CompiledStatement {
        let mut stmt = CompiledStatement::sql("SELECT ");

        let projection = self.projection.compile();
        if projection.is_empty() {
            stmt.sql.push_str(&qualify(Some(&self.alias), WILDCARD));
        } else {
            stmt.append(&projection);
        }
        for join in &self.joins {
            if !join.projection.is_empty() {
                stmt.sql.push_str(", ");
                stmt.append(&join.projection);
            }
        }

        stmt.sql.push_str(" FROM ");
        match &self.from {
            Some(query) => {
                stmt.sql.push('(');
                stmt.append(query);
                stmt.sql.push(')');
            }
            None => stmt.sql.push_str(&escape_identifier(&self.table_name)),
        }
        stmt.sql.push_str(" AS ");
        stmt.sql.push_str(&escape_identifier(&self.alias));

        for join in &self.joins {
            stmt.sql.push_str(&format!(
                " {} {} AS {} ON ",
                join.join_type,
                escape_identifier(&join.table_name),
                escape_identifier(&join.alias)
            ));
            if join.on.is_empty() {
                stmt.sql.push_str("1 = 1");
            } else {
                stmt.append(&join.on);
            }
        }

        let conditions = self.conditions.compile();
        if !conditions.is_empty() {
            stmt.sql.push_str(" WHERE ");
            stmt.append(&conditions);
        }

        if !self.group_by.is_empty() {
            stmt.sql.push_str(" GROUP BY ");
            stmt.sql.push_str(&self.group_by.join(", "));
        }

        if !self.order_by.is_empty() {
            let order = self
                .order_by
                .iter()
                .map(|(column, order)| format!("{} {}", column, order))
                .collect::<Vec<_>>()
                .join(", ");
            stmt.sql.push_str(" ORDER BY ");
            stmt.sql.push_str(&order);
        }

        if let Some(limit) = self.limit {
            stmt.sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            stmt.sql.push_str(&format!(" OFFSET {}", offset));
        }

        stmt
    }

    fn unique_alias(&self, table_name: &str) -> String {
        let base = default_alias(table_name);
        let taken = |candidate: &str| candidate == self.alias || self.joins.iter().any(|j| j.alias == candidate);
        if !taken(&base) {
            return base;
        }
        (1..)
            .map(|n| format!("{}{}", base, n))
            .find(|candidate| !taken(candidate))
            .unwrap_or(base)
    }
}

impl SqlCompilable for Query {
    fn compile(&self) -> RowmapResult<Vec<CompiledStatement>> {
        Ok(vec![Query::compile(self)])
    }
}
