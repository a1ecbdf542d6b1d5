//! Builds a `MapperTable` from a prototype instance of a model.
//!
//! Column types are inferred from the values the prototype (`M::default()`)
//! currently holds. A property whose prototype value is `None`/null has no
//! inferable type and must be declared with an explicit `FieldType`.

use tracing::debug;

use crate::ast::{FieldType, FieldValue, Model, PrimaryKeyType, Record};
use crate::error::{RowmapError, RowmapResult};
use crate::path::{IntoPath, PropertyPath};

use super::oracle::{MapperLookup, TypeKind, TypeOracle};
use super::table::{MapperColumn, MapperTable, dependency_columns};

/// Switches for [`MetadataTable::auto_mapper_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoMapperOptions {
    /// Flatten the simple properties of nested models as `{property}_{field}`.
    /// Only used when `include_reference_ids` is off.
    pub include_references: bool,
    /// Map nested models as foreign key columns `{property}_{key}`.
    pub include_reference_ids: bool,
    /// Follow nested models of nested models when mapping foreign keys.
    pub recursive_reference_ids: bool,
}

impl Default for AutoMapperOptions {
    fn default() -> Self {
        Self {
            include_references: true,
            include_reference_ids: true,
            recursive_reference_ids: true,
        }
    }
}

/// Mapping of one model type.
pub struct MetadataTable<'a, M: Model> {
    instance: M,
    record: Record,
    mapper_table: MapperTable,
    oracle: &'a dyn TypeOracle,
    lookup: &'a dyn MapperLookup,
    auto_mapper_called: bool,
    ignored: Vec<PropertyPath>,
}

impl<'a, M: Model> MetadataTable<'a, M> {
    pub fn new(oracle: &'a dyn TypeOracle, lookup: &'a dyn MapperLookup) -> Self {
        let instance = M::default();
        let record = instance.to_record();
        Self {
            instance,
            record,
            mapper_table: MapperTable::new(M::type_name()),
            oracle,
            lookup,
            auto_mapper_called: false,
            ignored: Vec::new(),
        }
    }

    /// The prototype instance.
    pub fn instance(&self) -> &M {
        &self.instance
    }

    pub fn table(&self) -> &MapperTable {
        &self.mapper_table
    }

    pub fn into_table(self) -> MapperTable {
        self.mapper_table
    }

    /// Map a property, inferring its type from the prototype.
    pub fn column(&mut self, path: impl IntoPath) -> RowmapResult<&mut Self> {
        self.column_with(path, None, None)
    }

    /// Map a property with an explicit type.
    pub fn column_typed(&mut self, path: impl IntoPath, field_type: FieldType) -> RowmapResult<&mut Self> {
        self.column_with(path, Some(field_type), None)
    }

    pub fn column_with(
        &mut self,
        path: impl IntoPath,
        field_type: Option<FieldType>,
        key: Option<PrimaryKeyType>,
    ) -> RowmapResult<&mut Self> {
        let path = path.into_path()?;
        let field_type = match field_type {
            Some(field_type) => field_type,
            None => self.infer_type(&path)?,
        };
        self.add_column(
            MapperColumn::new(path.column_name(), field_type)
                .primary_key(key)
                .field_reference(path.dotted()),
        )?;
        Ok(self)
    }

    /// Map a key column. Keys must be declared before `auto_mapper()`.
    pub fn key(&mut self, path: impl IntoPath, key_type: PrimaryKeyType) -> RowmapResult<&mut Self> {
        self.key_with(path, key_type, None)
    }

    pub fn key_with(
        &mut self,
        path: impl IntoPath,
        key_type: PrimaryKeyType,
        field_type: Option<FieldType>,
    ) -> RowmapResult<&mut Self> {
        if self.auto_mapper_called {
            return Err(RowmapError::configuration(format!(
                "Mapper '{}', column key must be informed before the call to 'auto_mapper()'",
                M::type_name()
            )));
        }
        self.column_with(path, field_type, Some(key_type))
    }

    /// Map a nested model as a foreign key column `{property}_{referencedKey}`.
    pub fn reference(&mut self, path: impl IntoPath) -> RowmapResult<&mut Self> {
        self.reference_with(path, None)
    }

    /// As [`reference`](Self::reference), naming the referenced type explicitly.
    pub fn reference_as(&mut self, path: impl IntoPath, type_name: &str) -> RowmapResult<&mut Self> {
        self.reference_with(path, Some(type_name))
    }

    fn reference_with(&mut self, path: impl IntoPath, type_name: Option<&str>) -> RowmapResult<&mut Self> {
        let path = path.into_path()?;
        let type_name = match type_name {
            Some(name) => name.to_string(),
            None => match self.prototype_value(&path)? {
                FieldValue::Object(record) => record.type_name().to_string(),
                other => {
                    return Err(RowmapError::configuration(format!(
                        "Mapper '{}', it is not allowed to map property '{}' of type '{:?}' as a reference. For it is not of a composite type",
                        M::type_name(),
                        path.column_name(),
                        FieldType::of(other)
                    )));
                }
            },
        };
        if let Some(column) = self.reference_column(&type_name, &path)? {
            self.add_column(column)?;
        }
        Ok(self)
    }

    /// Foreign key column named after an explicit key property of the nested model.
    pub fn reference_key(&mut self, path: impl IntoPath, key_path: impl IntoPath) -> RowmapResult<&mut Self> {
        self.reference_key_with(path, key_path, None)
    }

    pub fn reference_key_with(
        &mut self,
        path: impl IntoPath,
        key_path: impl IntoPath,
        field_type: Option<FieldType>,
    ) -> RowmapResult<&mut Self> {
        let path = path.into_path()?;
        let key_path = key_path.into_path()?;
        let name = format!("{}_{}", path.column_name(), key_path.column_name());
        let full = key_path
            .segments()
            .iter()
            .fold(path.clone(), |acc, segment| acc.child(segment));

        let field_type = match field_type {
            Some(field_type) => field_type,
            None => {
                let present = self
                    .record
                    .value_at(&path)
                    .is_some_and(|v| v.as_record().is_some_and(Record::is_present));
                if !present {
                    return Err(self.missing_instance(&name));
                }
                self.infer_type(&full)?
            }
        };
        self.add_column(MapperColumn::new(name, field_type).field_reference(full.dotted()))?;
        Ok(self)
    }

    /// Map a list of simple values through a dependency table
    /// `(index, value, {Parent}_{parentKey})`.
    pub fn has_many(
        &mut self,
        path: impl IntoPath,
        element_type: FieldType,
        table_name: &str,
    ) -> RowmapResult<&mut Self> {
        let path = path.into_path()?;
        let name = path.column_name();
        let parent = &self.mapper_table.table_name;

        let keys = self.mapper_table.key_columns();
        let key = match keys.as_slice() {
            [key] => (*key).clone(),
            [] => {
                return Err(RowmapError::configuration(format!(
                    "It is not possible to create a dependency mapper (\"{}\") if the primary key of the parent entity (\"{}\") is not yet mapped.",
                    name, parent
                )));
            }
            _ => {
                return Err(RowmapError::configuration(format!(
                    "Dependency mapper (\"{}\") not support relation with entity (\"{}\") with composite key [{}]!",
                    name,
                    parent,
                    keys.iter().map(|k| k.name.as_str()).collect::<Vec<_>>().join(", ")
                )));
            }
        };

        let element = element_type.element();
        if !element.is_resolved() {
            return Err(RowmapError::configuration(format!(
                "Mapper '{}', dependency '{}' needs an element type",
                M::type_name(),
                name
            )));
        }

        let mut dependency = MapperTable::new(table_name);
        dependency.add_column(
            MapperColumn::new(dependency_columns::INDEX, FieldType::NUMBER)
                .primary_key(Some(PrimaryKeyType::Assigned))
                .field_reference(dependency_columns::INDEX),
        );
        dependency.add_column(
            MapperColumn::new(dependency_columns::VALUE, element).field_reference(dependency_columns::VALUE),
        );
        dependency.add_column(
            MapperColumn::new(dependency_columns::reference(parent, &key.name), key.field_type)
                .primary_key(Some(PrimaryKeyType::Assigned))
                .field_reference(dependency_columns::REFERENCE_FIELD),
        );

        self.mapper_table.add_column(
            MapperColumn::new(name, FieldType::ARRAY | element)
                .field_reference(path.dotted())
                .dependency_table(table_name),
        );
        self.mapper_table.set_dependency(dependency);
        debug!(table = %self.mapper_table.table_name, dependency = table_name, "mapped dependency table");
        Ok(self)
    }

    /// Remove a property (and everything mapped below it) and keep
    /// `auto_mapper()` from adding it back.
    pub fn ignore(&mut self, path: impl IntoPath) -> RowmapResult<&mut Self> {
        let path = path.into_path()?;
        let dotted = path.dotted();
        let prefix = format!("{}.", dotted);

        let mut removed_dependencies = Vec::new();
        self.mapper_table.columns.retain(|column| {
            let reference = column.reference_path();
            let hit = reference == dotted || reference.starts_with(&prefix);
            if hit {
                if let Some(dependency) = &column.dependency_table {
                    removed_dependencies.push(dependency.clone());
                }
            }
            !hit
        });
        for dependency in removed_dependencies {
            self.mapper_table.remove_dependency(&dependency);
        }
        self.ignored.push(path);
        Ok(self)
    }

    pub fn auto_mapper(&mut self) -> RowmapResult<&mut Self> {
        self.auto_mapper_with(AutoMapperOptions::default())
    }

    /// Map every property of the prototype not declared yet.
    ///
    /// Simple values become columns. Nested models become foreign key columns
    /// when `include_reference_ids` is set, otherwise their simple properties
    /// are flattened when `include_references` is set. Lists are skipped.
    pub fn auto_mapper_with(&mut self, options: AutoMapperOptions) -> RowmapResult<&mut Self> {
        if self.mapper_table.key_columns().is_empty() {
            return Err(RowmapError::configuration(format!(
                "Mapper '{}', no column as key was informed to the Mapper",
                M::type_name()
            )));
        }

        let record = self.record.clone();
        for (name, value) in record.fields() {
            let path = PropertyPath::parse(name)?;
            if self.is_ignored(&path) || self.is_mapped(&path) {
                continue;
            }
            match self.oracle.classify(value) {
                TypeKind::Simple => {
                    self.add_column(MapperColumn::new(name, FieldType::of(value)).field_reference(name))?;
                }
                TypeKind::Composite if options.include_reference_ids => {
                    let mut visited = vec![M::type_name().to_string()];
                    self.map_reference_ids(value, &path, options.recursive_reference_ids, &mut visited)?;
                }
                TypeKind::Composite if options.include_references => {
                    self.flatten_reference(value, &path)?;
                }
                TypeKind::Composite | TypeKind::Ignored => {}
            }
        }

        self.auto_mapper_called = true;
        debug!(
            table = %self.mapper_table.table_name,
            columns = self.mapper_table.columns.len(),
            "auto mapped"
        );
        Ok(self)
    }

    fn map_reference_ids(
        &mut self,
        value: &FieldValue,
        path: &PropertyPath,
        recursive: bool,
        visited: &mut Vec<String>,
    ) -> RowmapResult<()> {
        let Some(record) = value.as_record() else {
            return Ok(());
        };
        let type_name = record.type_name();
        if let Some(column) = self.reference_column(type_name, path)? {
            if !self.mapper_table.has_column(&column.name) {
                self.add_column(column)?;
            }
        }

        if recursive && record.is_present() && !visited.iter().any(|v| v == type_name) {
            visited.push(type_name.to_string());
            for (name, nested) in record.fields() {
                let nested_path = path.child(name);
                if self.is_ignored(&nested_path) {
                    continue;
                }
                if self.oracle.classify(nested) == TypeKind::Composite {
                    self.map_reference_ids(nested, &nested_path, recursive, visited)?;
                }
            }
            visited.pop();
        }
        Ok(())
    }

    fn flatten_reference(&mut self, value: &FieldValue, path: &PropertyPath) -> RowmapResult<()> {
        let Some(record) = value.as_record() else {
            return Ok(());
        };
        for (name, nested) in record.fields() {
            let nested_path = path.child(name);
            if self.is_ignored(&nested_path) || self.is_mapped(&nested_path) {
                continue;
            }
            if self.oracle.is_simple(nested) {
                self.add_column(
                    MapperColumn::new(nested_path.column_name(), FieldType::of(nested))
                        .field_reference(nested_path.dotted()),
                )?;
            }
        }
        Ok(())
    }

    /// Foreign key column for a property holding a model of `type_name`.
    /// `None` when the type is not mapped but ignorable.
    fn reference_column(&self, type_name: &str, path: &PropertyPath) -> RowmapResult<Option<MapperColumn>> {
        let property = path.column_name();
        let referenced = if type_name == M::type_name() {
            Some(&self.mapper_table)
        } else {
            self.lookup.mapper(type_name)
        };

        match referenced {
            Some(table) => {
                let keys = table.key_columns();
                let key = match keys.as_slice() {
                    [key] => *key,
                    [] => {
                        return Err(RowmapError::configuration(format!(
                            "Mapper '{}', not key column for property '{}' of type '{}'",
                            M::type_name(),
                            property,
                            type_name
                        )));
                    }
                    _ => {
                        return Err(RowmapError::configuration(format!(
                            "Mapper '{}', composite Id not supported (property '{}' of type '{}')",
                            M::type_name(),
                            property,
                            type_name
                        )));
                    }
                };
                Ok(Some(
                    MapperColumn::new(format!("{}_{}", property, key.name), key.field_type)
                        .field_reference(format!("{}.{}", path.dotted(), key.reference_path())),
                ))
            }
            None if self.oracle.is_ignored_type(type_name) => Ok(None),
            None => Err(RowmapError::configuration(format!(
                "Mapper '{}', key '{}' of type '{}' not before mapped",
                M::type_name(),
                property,
                type_name
            ))),
        }
    }

    fn add_column(&mut self, column: MapperColumn) -> RowmapResult<()> {
        if !column.field_type.is_resolved() {
            return Err(RowmapError::configuration(format!(
                "Mapper '{}', can not infer the type of property '{}' from a null value, inform the type explicitly",
                M::type_name(),
                column.name
            )));
        }
        self.mapper_table.add_column(column);
        Ok(())
    }

    fn infer_type(&self, path: &PropertyPath) -> RowmapResult<FieldType> {
        self.prototype_value(path).map(FieldType::of)
    }

    fn prototype_value(&self, path: &PropertyPath) -> RowmapResult<&FieldValue> {
        self.record
            .value_at(path)
            .ok_or_else(|| self.missing_instance(&path.column_name()))
    }

    fn missing_instance(&self, property: &str) -> RowmapError {
        RowmapError::configuration(format!(
            "Mapper: {}, can not get instance of mapped property ('{}')",
            M::type_name(),
            property
        ))
    }

    fn is_ignored(&self, path: &PropertyPath) -> bool {
        self.ignored.iter().any(|ignored| path.starts_with(ignored))
    }

    fn is_mapped(&self, path: &PropertyPath) -> bool {
        let dotted = path.dotted();
        let prefix = format!("{}.", dotted);
        let name = path.column_name();
        self.mapper_table.columns.iter().any(|column| {
            let reference = column.reference_path();
            column.name == name || reference == dotted || reference.starts_with(&prefix)
        })
    }
}
