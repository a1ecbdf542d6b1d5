mod common;

use common::*;
use pretty_assertions::assert_eq;
use rowmap_core::prelude::*;

fn column_names(table: &MapperTable) -> Vec<&str> {
    table.columns.iter().map(|c| c.name.as_str()).collect()
}

#[test]
fn test_auto_mapper_keeps_declared_columns_first() {
    let registry = registry();
    let table = registry.get_for::<TestClazz>().unwrap();
    assert_eq!(
        column_names(table),
        vec!["id", "date", "tags", "description", "reference_test_id", "numero"]
    );

    let id = table.column("id").unwrap();
    assert_eq!(id.primary_key_type, Some(PrimaryKeyType::AutoIncrement));
    assert_eq!(id.field_type, FieldType::NUMBER);

    let date = table.column("date").unwrap();
    assert_eq!(date.field_type, FieldType::DATE);

    let reference = table.column("reference_test_id").unwrap();
    assert_eq!(reference.field_reference.as_deref(), Some("reference_test.id"));
    assert!(!reference.is_key());
}

#[test]
fn test_has_many_builds_dependency_table() {
    let registry = registry();
    let table = registry.get_for::<TestClazz>().unwrap();

    let tags = table.column("tags").unwrap();
    assert_eq!(tags.dependency_table.as_deref(), Some("TestClazz_tags"));
    assert_eq!(tags.field_type, FieldType::ARRAY | FieldType::STRING);

    let dependency = table.dependency("TestClazz_tags").unwrap();
    assert_eq!(column_names(dependency), vec!["index", "value", "TestClazz_id"]);
    assert_eq!(
        dependency
            .key_columns()
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>(),
        vec!["index", "TestClazz_id"]
    );
    assert_eq!(dependency.column("value").unwrap().field_type, FieldType::STRING);
    assert_eq!(dependency.column("TestClazz_id").unwrap().field_type, FieldType::NUMBER);
}

#[test]
fn test_recursive_reference_ids() {
    let registry = registry();
    let table = registry.get_for::<Customer>().unwrap();
    assert_eq!(
        column_names(table),
        vec!["id", "name", "city_code_import", "city_uf_code_import"]
    );
    assert_eq!(
        table.column("city_uf_code_import").unwrap().field_reference.as_deref(),
        Some("city.uf.code_import")
    );
    assert_eq!(table.column("id").unwrap().field_type, FieldType::GUID);
}

#[test]
fn test_reference_ids_without_recursion() {
    let registry = MapperRegistry::builder()
        .map::<Uf>(|m| {
            m.key("code_import", PrimaryKeyType::Assigned)?.auto_mapper()?;
            Ok(())
        })
        .and_then(|b| {
            b.map::<City>(|m| {
                m.key("code_import", PrimaryKeyType::Assigned)?.auto_mapper()?;
                Ok(())
            })
        })
        .and_then(|b| {
            b.map::<Customer>(|m| {
                m.key("id", PrimaryKeyType::Guid)?.auto_mapper_with(AutoMapperOptions {
                    recursive_reference_ids: false,
                    ..Default::default()
                })?;
                Ok(())
            })
        })
        .unwrap()
        .build();
    let table = registry.get_for::<Customer>().unwrap();
    assert_eq!(column_names(table), vec!["id", "name", "city_code_import"]);
}

#[test]
fn test_flatten_references_without_ids() {
    let registry = MapperRegistry::builder()
        .map::<Customer>(|m| {
            m.key("id", PrimaryKeyType::Guid)?.auto_mapper_with(AutoMapperOptions {
                include_references: true,
                include_reference_ids: false,
                recursive_reference_ids: false,
            })?;
            Ok(())
        })
        .unwrap()
        .build();
    let table = registry.get_for::<Customer>().unwrap();
    assert_eq!(
        column_names(table),
        vec!["id", "name", "city_code_import", "city_name"]
    );
    assert_eq!(
        table.column("city_name").unwrap().field_reference.as_deref(),
        Some("city.name")
    );
}

#[test]
fn test_reference_to_unmapped_type_fails() {
    let err = MapperRegistry::builder()
        .map::<City>(|m| {
            m.key("code_import", PrimaryKeyType::Assigned)?.auto_mapper()?;
            Ok(())
        })
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("key 'uf' of type 'Uf' not before mapped"));
}

#[test]
fn test_ignored_type_is_skipped() {
    let registry = rowmap_core::metadata::MapperRegistryBuilder::with_oracle(DefaultOracle::new().ignore_type("Uf"))
        .map::<City>(|m| {
            m.key("code_import", PrimaryKeyType::Assigned)?.auto_mapper()?;
            Ok(())
        })
        .unwrap()
        .build();
    let table = registry.get_for::<City>().unwrap();
    assert_eq!(column_names(table), vec!["code_import", "name"]);
}

#[test]
fn test_null_prototype_needs_explicit_type() {
    let err = MapperRegistry::builder()
        .map::<ReferenceTest>(|m| {
            m.key("id", PrimaryKeyType::AutoIncrement)?.auto_mapper()?;
            Ok(())
        })
        .and_then(|b| {
            b.map::<TestClazz>(|m| {
                m.key("id", PrimaryKeyType::AutoIncrement)?.auto_mapper()?;
                Ok(())
            })
        })
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("'date'"));
}

#[test]
fn test_key_after_auto_mapper_fails() {
    let err = MapperRegistry::builder()
        .map::<ReferenceTest>(|m| {
            m.key("id", PrimaryKeyType::AutoIncrement)?.auto_mapper()?;
            m.key("name", PrimaryKeyType::Assigned)?;
            Ok(())
        })
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("column key must be informed before the call to 'auto_mapper()'"));
}

#[test]
fn test_auto_mapper_requires_key() {
    let err = MapperRegistry::builder()
        .map::<ReferenceTest>(|m| {
            m.auto_mapper()?;
            Ok(())
        })
        .unwrap_err();
    assert!(err.to_string().contains("no column as key was informed"));
}

#[test]
fn test_has_many_requires_parent_key() {
    let err = MapperRegistry::builder()
        .map::<TestClazz>(|m| {
            m.has_many("tags", FieldType::STRING, "TestClazz_tags")?;
            Ok(())
        })
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("is not yet mapped"));
}

#[test]
fn test_ignore_removes_columns_and_dependency() {
    let registry = MapperRegistry::builder()
        .map::<ReferenceTest>(|m| {
            m.key("id", PrimaryKeyType::AutoIncrement)?.auto_mapper()?;
            Ok(())
        })
        .and_then(|b| {
            b.map::<TestClazz>(|m| {
                m.key("id", PrimaryKeyType::AutoIncrement)?
                    .column_typed("date", FieldType::DATE)?
                    .has_many("tags", FieldType::STRING, "TestClazz_tags")?
                    .ignore("tags")?
                    .ignore("reference_test")?
                    .auto_mapper()?;
                Ok(())
            })
        })
        .unwrap()
        .build();
    let table = registry.get_for::<TestClazz>().unwrap();
    assert_eq!(column_names(table), vec!["id", "date", "description", "numero"]);
    assert!(table.dependencies.is_empty());
}

#[test]
fn test_ignore_keeps_other_columns() {
    let registry = MapperRegistry::builder()
        .map::<ReferenceTest>(|m| {
            m.key("id", PrimaryKeyType::AutoIncrement)?.auto_mapper()?;
            Ok(())
        })
        .and_then(|b| {
            b.map::<TestClazz>(|m| {
                m.key("id", PrimaryKeyType::AutoIncrement)?
                    .column_typed("date", FieldType::DATE)?
                    .has_many("tags", FieldType::STRING, "TestClazz_tags")?
                    .ignore("date")?
                    .auto_mapper()?;
                Ok(())
            })
        })
        .unwrap()
        .build();
    let table = registry.get_for::<TestClazz>().unwrap();
    assert_eq!(
        column_names(table),
        vec!["id", "tags", "description", "reference_test_id", "numero"]
    );
    assert!(table.dependency("TestClazz_tags").is_some());
}

#[test]
fn test_has_many_rejects_composite_parent_key() {
    let err = MapperRegistry::builder()
        .map::<TestClazz>(|m| {
            m.key("id", PrimaryKeyType::AutoIncrement)?
                .key("numero", PrimaryKeyType::Assigned)?
                .has_many("tags", FieldType::STRING, "TestClazz_tags")?;
            Ok(())
        })
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("composite key [id, numero]"));
}

#[test]
fn test_explicit_reference_key() {
    let registry = MapperRegistry::builder()
        .map::<Customer>(|m| {
            m.key("id", PrimaryKeyType::Guid)?
                .reference_key("city", "name")?
                .column("name")?;
            Ok(())
        })
        .unwrap()
        .build();
    let table = registry.get_for::<Customer>().unwrap();
    let column = table.column("city_name").unwrap();
    assert_eq!(column.field_type, FieldType::STRING);
    assert_eq!(column.field_reference.as_deref(), Some("city.name"));
}

#[test]
fn test_unknown_property_fails() {
    let err = MapperRegistry::builder()
        .map::<Uf>(|m| {
            m.column("missing")?;
            Ok(())
        })
        .unwrap_err();
    assert!(err.to_string().contains("can not get instance of mapped property ('missing')"));
}

#[test]
fn test_metadata_json_dump() {
    let registry = registry();
    let json = registry.get_for::<TestClazz>().unwrap().to_json().unwrap();
    assert!(json.contains("\"table_name\": \"TestClazz_tags\""));
    assert!(json.contains("\"dependency_table\": \"TestClazz_tags\""));
}
