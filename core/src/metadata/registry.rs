use std::collections::HashMap;

use tracing::{debug, warn};

use crate::ast::Model;
use crate::error::{RowmapError, RowmapResult};

use super::mapper::MetadataTable;
use super::oracle::{DefaultOracle, MapperLookup, TypeOracle};
use super::table::MapperTable;

/// Frozen set of mapped tables, keyed by model type name.
#[derive(Debug, Clone, Default)]
pub struct MapperRegistry {
    tables: Vec<MapperTable>,
    by_type: HashMap<String, usize>,
}

impl MapperRegistry {
    pub fn builder() -> MapperRegistryBuilder {
        MapperRegistryBuilder::new()
    }

    pub fn get(&self, type_name: &str) -> Option<&MapperTable> {
        self.by_type.get(type_name).map(|&index| &self.tables[index])
    }

    pub fn require(&self, type_name: &str) -> RowmapResult<&MapperTable> {
        self.get(type_name).ok_or_else(|| {
            RowmapError::configuration(format!("Mapper for type '{}' is not registered", type_name))
        })
    }

    pub fn get_for<M: Model>(&self) -> RowmapResult<&MapperTable> {
        self.require(M::type_name())
    }

    /// Tables in registration order.
    pub fn tables(&self) -> impl Iterator<Item = &MapperTable> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    fn insert(&mut self, type_name: &str, table: MapperTable) {
        match self.by_type.get(type_name) {
            Some(&index) => {
                warn!(type_name, "mapper registered twice, replacing");
                self.tables[index] = table;
            }
            None => {
                self.by_type.insert(type_name.to_string(), self.tables.len());
                self.tables.push(table);
            }
        }
    }
}

impl MapperLookup for MapperRegistry {
    fn mapper(&self, type_name: &str) -> Option<&MapperTable> {
        self.get(type_name)
    }
}

/// Populates a [`MapperRegistry`]. Referenced types must be mapped first.
///
/// ```ignore
/// let registry = MapperRegistry::builder()
///     .map::<Brand>(|t| {
///         t.key("id", PrimaryKeyType::AutoIncrement)?.auto_mapper()?;
///         Ok(())
///     })?
///     .build();
/// ```
pub struct MapperRegistryBuilder {
    registry: MapperRegistry,
    oracle: Box<dyn TypeOracle>,
}

impl std::fmt::Debug for MapperRegistryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapperRegistryBuilder")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Default for MapperRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MapperRegistryBuilder {
    pub fn new() -> Self {
        Self::with_oracle(DefaultOracle::new())
    }

    pub fn with_oracle(oracle: impl TypeOracle + 'static) -> Self {
        Self {
            registry: MapperRegistry::default(),
            oracle: Box::new(oracle),
        }
    }

    /// Map model `M` with the given configuration.
    pub fn map<M: Model>(
        mut self,
        configure: impl FnOnce(&mut MetadataTable<'_, M>) -> RowmapResult<()>,
    ) -> RowmapResult<Self> {
        let table = {
            let mut metadata = MetadataTable::<M>::new(self.oracle.as_ref(), &self.registry);
            configure(&mut metadata)?;
            metadata.into_table()
        };
        debug!(type_name = M::type_name(), columns = table.columns.len(), "registered mapper");
        self.registry.insert(M::type_name(), table);
        Ok(self)
    }

    /// Register prebuilt metadata under a type name.
    pub fn table(mut self, type_name: &str, table: MapperTable) -> Self {
        self.registry.insert(type_name, table);
        self
    }

    pub fn build(self) -> MapperRegistry {
        self.registry
    }
}
