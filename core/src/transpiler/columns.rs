//! Column/value pairs for INSERT and UPDATE payloads.

use tracing::debug;
use uuid::Uuid;

use crate::ast::{FieldType, PrimaryKeyType, Record, Value};
use crate::error::{RowmapError, RowmapResult};
use crate::metadata::MapperTable;
use crate::path::{IntoPath, PropertyPath};

use super::traits::{PLACEHOLDER, escape_identifier};

/// How emitted columns are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnsFormat {
    /// Bare column names; auto increment keys are left to the backend.
    Insert,
    /// `name = ?` assignments.
    Update,
}

impl ColumnsFormat {
    fn format(&self, name: &str) -> String {
        match self {
            ColumnsFormat::Insert => escape_identifier(name),
            ColumnsFormat::Update => format!("{} = {}", escape_identifier(name), PLACEHOLDER),
        }
    }

    fn includes(&self, column: &ColumnValue) -> bool {
        let auto_increment = column.primary_key_type == Some(PrimaryKeyType::AutoIncrement);
        match self {
            ColumnsFormat::Insert => !auto_increment,
            // an explicitly set key is allowed in SET
            ColumnsFormat::Update => !auto_increment || column.explicit,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnValue {
    pub name: String,
    pub field_type: FieldType,
    pub primary_key_type: Option<PrimaryKeyType>,
    pub value: Value,
    explicit: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnsCompiled {
    pub columns: Vec<String>,
    /// Key columns in declaration order, emitted or not.
    pub key_columns: Vec<String>,
    pub params: Vec<Value>,
}

/// Collects column values from the mapped model (all columns) or from
/// explicit `set` / `set_value` calls.
#[derive(Debug, Clone)]
pub struct ColumnsBuilder<'a> {
    table: &'a MapperTable,
    model: Option<&'a Record>,
    format: ColumnsFormat,
    columns: Vec<ColumnValue>,
}

impl<'a> ColumnsBuilder<'a> {
    pub fn new(table: &'a MapperTable, model: Option<&'a Record>, format: ColumnsFormat) -> Self {
        Self {
            table,
            model,
            format,
            columns: Vec::new(),
        }
    }

    /// Replace the collected columns with every stored column of the table.
    pub fn all_columns(&mut self) -> RowmapResult<&mut Self> {
        self.columns.clear();
        let table = self.table;
        for column in table.stored_columns() {
            let value = self.model_value(column.reference_path())?;
            self.push(
                column.name.clone(),
                column.field_type,
                column.primary_key_type,
                value,
                false,
            );
        }
        Ok(self)
    }

    /// Take the value for `path` from the model.
    pub fn set(&mut self, path: impl IntoPath) -> RowmapResult<&mut Self> {
        let path = path.into_path()?;
        if self.model.is_none() {
            return Err(RowmapError::configuration(format!(
                "Table '{}', no model to read '{}' from",
                self.table.table_name, path
            )));
        }
        let value = self.model_value(&path.dotted())?;
        self.set_path(&path, value);
        Ok(self)
    }

    pub fn set_value(&mut self, path: impl IntoPath, value: impl Into<Value>) -> RowmapResult<&mut Self> {
        let path = path.into_path()?;
        self.set_path(&path, value.into());
        Ok(self)
    }

    /// Add a column that is not necessarily mapped.
    pub fn set_column(
        &mut self,
        name: &str,
        value: Value,
        field_type: FieldType,
        primary_key_type: Option<PrimaryKeyType>,
    ) -> &mut Self {
        self.push(name.to_string(), field_type, primary_key_type, value, true);
        self
    }

    /// Value collected for `name`, including generated keys.
    pub fn value_of(&self, name: &str) -> Option<&Value> {
        self.columns.iter().find(|c| c.name == name).map(|c| &c.value)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn compile(&self) -> ColumnsCompiled {
        let mut compiled = ColumnsCompiled::default();
        for column in &self.columns {
            if column.primary_key_type.is_some() {
                compiled.key_columns.push(column.name.clone());
            }
            if self.format.includes(column) {
                compiled.columns.push(self.format.format(&column.name));
                compiled.params.push(column.value.clone());
            }
        }
        compiled
    }

    fn set_path(&mut self, path: &PropertyPath, value: Value) {
        let name = path.column_name();
        let (field_type, key) = match self.table.column(&name) {
            Some(column) => (column.field_type, column.primary_key_type),
            None => (FieldType::of_value(&value), None),
        };
        self.push(name, field_type, key, value, true);
    }

    fn push(
        &mut self,
        name: String,
        field_type: FieldType,
        primary_key_type: Option<PrimaryKeyType>,
        value: Value,
        explicit: bool,
    ) {
        let missing = match &value {
            Value::Null => true,
            Value::Guid(id) => id.is_nil(),
            _ => false,
        };
        let value = if self.format == ColumnsFormat::Insert
            && primary_key_type == Some(PrimaryKeyType::Guid)
            && missing
        {
            generate_guid(&name)
        } else {
            value
        };
        self.columns.push(ColumnValue {
            name,
            field_type,
            primary_key_type,
            value,
            explicit,
        });
    }

    fn model_value(&self, reference: &str) -> RowmapResult<Value> {
        let Some(model) = self.model else {
            return Ok(Value::Null);
        };
        let path = PropertyPath::parse(reference)?;
        match model.value_at(&path) {
            Some(value) => value.to_bind_value(),
            None => Ok(Value::Null),
        }
    }
}

fn generate_guid(column: &str) -> Value {
    let id = Uuid::new_v4();
    debug!(column, %id, "generated key");
    Value::Guid(id)
}
