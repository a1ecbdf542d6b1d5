//! Mapper metadata and SQL statement compilers.
//!
//! Models describe themselves through [`ast::Model`]; a
//! [`metadata::MapperRegistry`] turns them into table metadata and the
//! [`transpiler`] builders compile that metadata into parameterized SQL.
//!
//! ```ignore
//! use rowmap_core::prelude::*;
//!
//! let registry = MapperRegistry::builder()
//!     .map::<Brand>(|m| {
//!         m.key("id", PrimaryKeyType::AutoIncrement)?.auto_mapper()?;
//!         Ok(())
//!     })?
//!     .build();
//!
//! let mut query = Query::for_model::<Brand>();
//! query.filter(|w| {
//!     w.equal("name", "Acme")?;
//!     Ok(())
//! })?;
//! // SELECT bra.* FROM Brand AS bra WHERE bra.name = ?
//! ```

pub mod ast;
pub mod error;
pub mod metadata;
pub mod path;
pub mod transpiler;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::error::*;
    pub use crate::metadata::{
        AutoMapperOptions, DefaultOracle, MapperColumn, MapperRegistry, MapperTable, MetadataTable,
        TypeOracle,
    };
    pub use crate::model;
    pub use crate::path::{Field, IntoPath, PropertyPath};
    pub use crate::transpiler::{
        AlterTable, CompiledStatement, CreateTable, Delete, DropTable, Insert, Query, SqlCompilable, Update,
        WhereBuilder,
    };
}
