use std::collections::HashSet;

use crate::ast::FieldValue;

use super::MapperTable;

/// Classification of a property value while mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Stored directly in a column.
    Simple,
    /// A nested model, mapped through a reference column.
    Composite,
    /// Skipped by automatic mapping.
    Ignored,
}

/// Decides how property values are treated by the mapper.
pub trait TypeOracle: Send + Sync {
    /// Types that may be referenced without being mapped.
    fn is_ignored_type(&self, type_name: &str) -> bool;

    fn classify(&self, value: &FieldValue) -> TypeKind {
        match value {
            FieldValue::Value(_) => TypeKind::Simple,
            FieldValue::Object(record) if self.is_ignored_type(record.type_name()) => TypeKind::Ignored,
            FieldValue::Object(_) => TypeKind::Composite,
            FieldValue::List(_) => TypeKind::Ignored,
        }
    }

    fn is_simple(&self, value: &FieldValue) -> bool {
        self.classify(value) == TypeKind::Simple
    }
}

/// Scalars are simple, nested models are composite, lists are ignored.
#[derive(Debug, Clone, Default)]
pub struct DefaultOracle {
    ignored_types: HashSet<String>,
}

impl DefaultOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat models of this type as ignorable.
    pub fn ignore_type(mut self, type_name: impl Into<String>) -> Self {
        self.ignored_types.insert(type_name.into());
        self
    }
}

impl TypeOracle for DefaultOracle {
    fn is_ignored_type(&self, type_name: &str) -> bool {
        self.ignored_types.contains(type_name)
    }
}

/// Resolves the metadata of an already mapped type.
pub trait MapperLookup {
    fn mapper(&self, type_name: &str) -> Option<&MapperTable>;
}
