//! Model metadata: table and column descriptions, the mapper that builds
//! them and the registry that holds them.

pub mod mapper;
pub mod oracle;
pub mod registry;
pub mod table;

pub use mapper::{AutoMapperOptions, MetadataTable};
pub use oracle::{DefaultOracle, MapperLookup, TypeKind, TypeOracle};
pub use registry::{MapperRegistry, MapperRegistryBuilder};
pub use table::{MapperColumn, MapperTable, dependency_columns};
