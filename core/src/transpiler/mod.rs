//! Statement compilers: mapper metadata and fluent builders in,
//! [`CompiledStatement`]s out.

pub mod columns;
pub mod compiled;
pub mod conditions;
pub mod ddl;
pub mod dml;
pub mod projection;
pub mod traits;

pub use columns::{ColumnsBuilder, ColumnsCompiled, ColumnsFormat};
pub use compiled::{CompiledStatement, SqlCompilable};
pub use conditions::{ColumnRef, InSet, Operand, WhereBuilder};
pub use ddl::{AlterTable, CreateTable, DropTable};
pub use dml::{Delete, Insert, Query, Update, default_alias};
pub use projection::{CaseBuilder, ProjectionBuilder, ProjectionItem};
pub use traits::{escape_identifier, is_name_column, placeholders, qualify};
