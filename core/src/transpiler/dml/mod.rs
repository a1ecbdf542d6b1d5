//! DML statement builders.
//!
//! Every builder compiles to parent statements first, followed by the
//! statements of its dependency tables (delete runs dependents first).

pub mod delete;
pub mod insert;
pub mod select;
pub mod update;

pub use delete::Delete;
pub use insert::Insert;
pub use select::{Query, default_alias};
pub use update::Update;

use crate::ast::{FieldValue, Record, Value};
use crate::error::{RowmapError, RowmapResult};
use crate::metadata::MapperTable;
use crate::path::PropertyPath;

use super::compiled::CompiledStatement;
use super::traits::{escape_identifier, placeholders};

/// Value of the parent key read from the model, `None` when unset.
pub(crate) fn model_key(table: &MapperTable, model: &Record) -> RowmapResult<Option<Value>> {
    let key = table.single_key()?;
    let path = PropertyPath::parse(key.reference_path())?;
    let value = model.value_at(&path).map(FieldValue::to_bind_value).transpose()?;
    Ok(value.filter(|value| !value.is_null()))
}

/// Items of the list mapped to `dependency`, `None` when the list is empty or missing.
pub(crate) fn dependency_items<'m>(
    table: &MapperTable,
    dependency: &MapperTable,
    model: &'m Record,
) -> RowmapResult<Option<&'m [FieldValue]>> {
    let Some(list_column) = table
        .columns
        .iter()
        .find(|c| c.dependency_table.as_deref() == Some(dependency.table_name.as_str()))
    else {
        return Ok(None);
    };
    let path = PropertyPath::parse(list_column.reference_path())?;
    match model.value_at(&path) {
        Some(FieldValue::List(items)) if !items.is_empty() => Ok(Some(items.as_slice())),
        _ => Ok(None),
    }
}

/// Multi-row INSERT for one dependency table, `None` when the list is empty or missing.
pub(crate) fn dependency_insert(
    table: &MapperTable,
    dependency: &MapperTable,
    model: &Record,
    parent_key: Option<&Value>,
) -> RowmapResult<Option<CompiledStatement>> {
    let Some(items) = dependency_items(table, dependency, model)? else {
        return Ok(None);
    };
    let Some(parent_key) = parent_key else {
        return Err(RowmapError::configuration(format!(
            "Table '{}', the key value is required to persist dependency '{}'",
            table.table_name, dependency.table_name
        )));
    };

    let columns = dependency
        .columns
        .iter()
        .map(|c| escape_identifier(&c.name))
        .collect::<Vec<_>>();
    let row = format!("({})", placeholders(columns.len()));

    let mut stmt = CompiledStatement::sql(format!(
        "INSERT INTO {} ({}) VALUES ",
        escape_identifier(&dependency.table_name),
        columns.join(", ")
    ));
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            stmt.sql.push_str(", ");
        }
        stmt.push(
            &row,
            [Value::Int(index as i64), item.to_bind_value()?, parent_key.clone()],
        );
    }
    Ok(Some(stmt))
}

/// Column in a dependency table that points at the parent row.
pub(crate) fn dependency_reference_column(table: &MapperTable) -> RowmapResult<(String, String)> {
    let key = table.single_key()?;
    Ok((
        key.name.clone(),
        crate::metadata::table::dependency_columns::reference(&table.table_name, &key.name),
    ))
}
