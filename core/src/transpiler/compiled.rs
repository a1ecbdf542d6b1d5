use serde::{Deserialize, Serialize};

use crate::ast::Value;
use crate::error::RowmapResult;

use super::traits::PLACEHOLDER;

/// SQL text with its positional parameters, in binding order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl CompiledStatement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Statement without parameters.
    pub fn sql(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Bind a value and return its placeholder.
    pub fn bind(&mut self, value: Value) -> &'static str {
        self.params.push(value);
        PLACEHOLDER
    }

    /// Append SQL text and its parameters.
    pub fn push(&mut self, sql: &str, params: impl IntoIterator<Item = Value>) {
        self.sql.push_str(sql);
        self.params.extend(params);
    }

    /// Append another compiled fragment.
    pub fn append(&mut self, other: &CompiledStatement) {
        self.push(&other.sql, other.params.iter().cloned());
    }

    /// Number of `?` placeholders outside string literals.
    pub fn placeholder_count(&self) -> usize {
        let mut in_literal = false;
        self.sql
            .chars()
            .filter(|&c| {
                if c == '\'' {
                    in_literal = !in_literal;
                }
                !in_literal && c == '?'
            })
            .count()
    }
}

impl std::fmt::Display for CompiledStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sql)
    }
}

/// Anything that compiles to one or more statements, parent table first.
pub trait SqlCompilable {
    fn compile(&self) -> RowmapResult<Vec<CompiledStatement>>;
}

impl SqlCompilable for CompiledStatement {
    fn compile(&self) -> RowmapResult<Vec<CompiledStatement>> {
        Ok(vec![self.clone()])
    }
}

impl SqlCompilable for Vec<CompiledStatement> {
    fn compile(&self) -> RowmapResult<Vec<CompiledStatement>> {
        Ok(self.clone())
    }
}
