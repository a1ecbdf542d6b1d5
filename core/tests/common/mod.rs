#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use rowmap_core::prelude::*;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct Uf {
    pub code_import: i64,
    pub name: String,
}
rowmap_core::model!(Uf { code_import, name });

#[derive(Debug, Clone, Default)]
pub struct City {
    pub code_import: i64,
    pub name: String,
    pub uf: Option<Uf>,
}
rowmap_core::model!(City { code_import, name, uf });

#[derive(Debug, Clone)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub city: Option<City>,
}
rowmap_core::model!(Customer { id, name, city });

// the prototype carries a full city so nested keys can be discovered
impl Default for Customer {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            name: String::new(),
            city: Some(City {
                uf: Some(Uf::default()),
                ..Default::default()
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceTest {
    pub id: i64,
    pub name: String,
}
rowmap_core::model!(ReferenceTest { id, name });

#[derive(Debug, Clone, Default)]
pub struct TestClazz {
    pub id: i64,
    pub description: String,
    pub reference_test: Option<ReferenceTest>,
    pub numero: i64,
    pub date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}
rowmap_core::model!(TestClazz { id, description, reference_test, numero, date, tags });

pub const DESCRIPTION: Field<TestClazz> = Field::new("description");

pub fn registry() -> MapperRegistry {
    MapperRegistry::builder()
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
                m.key("id", PrimaryKeyType::Guid)?.auto_mapper()?;
                Ok(())
            })
        })
        .and_then(|b| {
            b.map::<ReferenceTest>(|m| {
                m.key("id", PrimaryKeyType::AutoIncrement)?.auto_mapper()?;
                Ok(())
            })
        })
        .and_then(|b| {
            b.map::<TestClazz>(|m| {
                m.key("id", PrimaryKeyType::AutoIncrement)?
                    .column_typed("date", FieldType::DATE)?
                    .has_many("tags", FieldType::STRING, "TestClazz_tags")?
                    .auto_mapper()?;
                Ok(())
            })
        })
        .expect("fixture mappers")
        .build()
}

pub fn sample_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().expect("valid date")
}

pub fn sample_clazz() -> TestClazz {
    TestClazz {
        id: 7,
        description: "first".to_string(),
        reference_test: Some(ReferenceTest {
            id: 3,
            name: "ref".to_string(),
        }),
        numero: 42,
        date: Some(sample_date()),
        tags: vec!["a".to_string(), "b".to_string()],
    }
}
