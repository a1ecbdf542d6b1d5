//! Normalized table metadata.

use serde::{Deserialize, Serialize};

use crate::ast::{FieldType, PrimaryKeyType};
use crate::error::{RowmapError, RowmapResult};

/// Columns of a dependency table, in declaration order.
pub mod dependency_columns {
    pub const INDEX: &str = "index";
    pub const VALUE: &str = "value";

    /// Name of the column pointing back at the parent row.
    pub fn reference(parent_table: &str, parent_key: &str) -> String {
        format!("{}_{}", parent_table, parent_key)
    }

    /// Field reference used for the parent key inside a dependency row.
    pub const REFERENCE_FIELD: &str = "reference";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapperColumn {
    pub name: String,
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key_type: Option<PrimaryKeyType>,
    /// Dotted path into the model that holds the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_reference: Option<String>,
    /// Set on list columns mapped through a dependency table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_table: Option<String>,
}

impl MapperColumn {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            primary_key_type: None,
            field_reference: None,
            dependency_table: None,
        }
    }

    pub fn primary_key(mut self, key: Option<PrimaryKeyType>) -> Self {
        self.primary_key_type = key;
        self
    }

    pub fn field_reference(mut self, reference: impl Into<String>) -> Self {
        self.field_reference = Some(reference.into());
        self
    }

    pub fn dependency_table(mut self, table: impl Into<String>) -> Self {
        self.dependency_table = Some(table.into());
        self
    }

    pub fn is_key(&self) -> bool {
        self.primary_key_type.is_some()
    }

    pub fn is_dependency(&self) -> bool {
        self.dependency_table.is_some()
    }

    /// Path used to read the value from a model snapshot.
    pub fn reference_path(&self) -> &str {
        self.field_reference.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapperTable {
    pub table_name: String,
    pub columns: Vec<MapperColumn>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<MapperTable>,
}

impl MapperTable {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            columns: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    /// Add a column, replacing a column of the same name in place.
    pub fn add_column(&mut self, column: MapperColumn) {
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
    }

    pub fn remove_column(&mut self, name: &str) -> Option<MapperColumn> {
        let index = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(index))
    }

    pub fn column(&self, name: &str) -> Option<&MapperColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Column whose value is read from `reference`.
    pub fn column_by_reference(&self, reference: &str) -> Option<&MapperColumn> {
        self.columns.iter().find(|c| c.reference_path() == reference)
    }

    pub fn key_columns(&self) -> Vec<&MapperColumn> {
        self.columns.iter().filter(|c| c.is_key()).collect()
    }

    /// The one key column, for places that cannot handle composite keys.
    pub fn single_key(&self) -> RowmapResult<&MapperColumn> {
        let keys = self.key_columns();
        match keys.as_slice() {
            [key] => Ok(key),
            [] => Err(RowmapError::configuration(format!(
                "Mapper '{}', no column as key was informed to the Mapper",
                self.table_name
            ))),
            _ => Err(RowmapError::configuration(format!(
                "Mapper '{}', composite Id not supported [{}]",
                self.table_name,
                keys.iter().map(|k| k.name.as_str()).collect::<Vec<_>>().join(", ")
            ))),
        }
    }

    /// Columns stored in this table; list columns live in their dependency table.
    pub fn stored_columns(&self) -> impl Iterator<Item = &MapperColumn> {
        self.columns.iter().filter(|c| !c.is_dependency())
    }

    pub fn dependency(&self, table_name: &str) -> Option<&MapperTable> {
        self.dependencies.iter().find(|d| d.table_name == table_name)
    }

    pub(crate) fn set_dependency(&mut self, dependency: MapperTable) {
        match self
            .dependencies
            .iter_mut()
            .find(|d| d.table_name == dependency.table_name)
        {
            Some(existing) => *existing = dependency,
            None => self.dependencies.push(dependency),
        }
    }

    pub(crate) fn remove_dependency(&mut self, table_name: &str) {
        self.dependencies.retain(|d| d.table_name != table_name);
    }

    /// Pretty JSON dump of the metadata.
    pub fn to_json(&self) -> RowmapResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| RowmapError::configuration(format!("Failed to serialize metadata: {}", e)))
    }
}
