//! Schema statements derived from mapper metadata.

use crate::ast::{FieldType, PrimaryKeyType};
use crate::error::RowmapResult;
use crate::metadata::{MapperColumn, MapperTable};
use crate::path::IntoPath;

use super::compiled::{CompiledStatement, SqlCompilable};
use super::traits::escape_identifier;

/// `CREATE TABLE IF NOT EXISTS` for a table and its dependency tables.
#[derive(Debug, Clone, Copy)]
pub struct CreateTable<'a> {
    table: &'a MapperTable,
}

impl<'a> CreateTable<'a> {
    pub fn new(table: &'a MapperTable) -> Self {
        Self { table }
    }
}

impl SqlCompilable for CreateTable<'_> {
    fn compile(&self) -> RowmapResult<Vec<CompiledStatement>> {
        let mut statements = vec![create_table(self.table)];
        statements.extend(self.table.dependencies.iter().map(create_table));
        Ok(statements)
    }
}

fn create_table(table: &MapperTable) -> CompiledStatement {
    let keys = table.key_columns();
    // a lone auto increment key becomes the rowid alias
    let inline_key = match keys.as_slice() {
        [key] if key.primary_key_type == Some(PrimaryKeyType::AutoIncrement) => Some(key.name.as_str()),
        _ => None,
    };

    let mut definitions = table
        .stored_columns()
        .map(|column| column_definition(column, inline_key))
        .collect::<Vec<_>>();
    if inline_key.is_none() && !keys.is_empty() {
        definitions.push(format!(
            "PRIMARY KEY ({})",
            keys.iter()
                .map(|k| escape_identifier(&k.name))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    CompiledStatement::sql(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        escape_identifier(&table.table_name),
        definitions.join(", ")
    ))
}

fn column_definition(column: &MapperColumn, inline_key: Option<&str>) -> String {
    let name = escape_identifier(&column.name);
    if inline_key == Some(column.name.as_str()) {
        return format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", name);
    }
    if column.is_key() {
        format!("{} {} NOT NULL", name, column.field_type.sql_type())
    } else {
        format!("{} {}", name, column.field_type.sql_type())
    }
}

/// `DROP TABLE IF EXISTS`, dependency tables first.
#[derive(Debug, Clone, Copy)]
pub struct DropTable<'a> {
    table: &'a MapperTable,
}

impl<'a> DropTable<'a> {
    pub fn new(table: &'a MapperTable) -> Self {
        Self { table }
    }
}

impl SqlCompilable for DropTable<'_> {
    fn compile(&self) -> RowmapResult<Vec<CompiledStatement>> {
        let drop = |name: &str| CompiledStatement::sql(format!("DROP TABLE IF EXISTS {}", escape_identifier(name)));
        let mut statements = self
            .table
            .dependencies
            .iter()
            .map(|d| drop(&d.table_name))
            .collect::<Vec<_>>();
        statements.push(drop(&self.table.table_name));
        Ok(statements)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum AlterOperation {
    AddColumn { name: String, field_type: FieldType },
    RenameColumn { from: String, to: String },
    RenameTable { to: String },
}

/// `ALTER TABLE` operations, one statement each.
#[derive(Debug, Clone)]
pub struct AlterTable {
    table_name: String,
    operations: Vec<AlterOperation>,
}

impl AlterTable {
    pub fn new(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            operations: Vec::new(),
        }
    }

    pub fn add_column(&mut self, path: impl IntoPath, field_type: FieldType) -> RowmapResult<&mut Self> {
        self.operations.push(AlterOperation::AddColumn {
            name: path.into_path()?.column_name(),
            field_type,
        });
        Ok(self)
    }

    pub fn rename_column(&mut self, from: impl IntoPath, to: impl IntoPath) -> RowmapResult<&mut Self> {
        self.operations.push(AlterOperation::RenameColumn {
            from: from.into_path()?.column_name(),
            to: to.into_path()?.column_name(),
        });
        Ok(self)
    }

    pub fn rename_table(&mut self, to: &str) -> &mut Self {
        self.operations.push(AlterOperation::RenameTable { to: to.to_string() });
        self
    }
}

impl SqlCompilable for AlterTable {
    fn compile(&self) -> RowmapResult<Vec<CompiledStatement>> {
        let table = escape_identifier(&self.table_name);
        Ok(self
            .operations
            .iter()
            .map(|operation| {
                let sql = match operation {
                    AlterOperation::AddColumn { name, field_type } => format!(
                        "ALTER TABLE {} ADD COLUMN {} {}",
                        table,
                        escape_identifier(name),
                        field_type.sql_type()
                    ),
                    AlterOperation::RenameColumn { from, to } => format!(
                        "ALTER TABLE {} RENAME COLUMN {} TO {}",
                        table,
                        escape_identifier(from),
                        escape_identifier(to)
                    ),
                    AlterOperation::RenameTable { to } => {
                        format!("ALTER TABLE {} RENAME TO {}", table, escape_identifier(to))
                    }
                };
                CompiledStatement::sql(sql)
            })
            .collect())
    }
}
