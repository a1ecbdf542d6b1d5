use serde::{Deserialize, Serialize};

use super::values::{FieldValue, Value};

bitflags::bitflags! {
    /// Value kind of a mapped column.
    ///
    /// `ARRAY` is combined with an element flag to describe the list held by a
    /// dependency column, e.g. `ARRAY | STRING`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct FieldType: u16 {
        const NULL = 1;
        const STRING = 1 << 1;
        const NUMBER = 1 << 2;
        const BOOLEAN = 1 << 3;
        const DATE = 1 << 4;
        const GUID = 1 << 5;
        const BLOB = 1 << 6;
        const OBJECT = 1 << 7;
        const ARRAY = 1 << 8;
    }
}

impl FieldType {
    /// Kind of a scalar value.
    pub fn of_value(value: &Value) -> FieldType {
        match value {
            Value::Null => FieldType::NULL,
            Value::Bool(_) => FieldType::BOOLEAN,
            Value::Int(_) | Value::Float(_) | Value::Decimal(_) => FieldType::NUMBER,
            Value::String(_) => FieldType::STRING,
            Value::Date(_) => FieldType::DATE,
            Value::Guid(_) => FieldType::GUID,
            Value::Blob(_) => FieldType::BLOB,
        }
    }

    /// Kind of a property value taken from a model snapshot.
    ///
    /// Lists take the element kind of their first element; an empty list is
    /// plain `ARRAY`.
    pub fn of(value: &FieldValue) -> FieldType {
        match value {
            FieldValue::Value(v) => FieldType::of_value(v),
            FieldValue::Object(_) => FieldType::OBJECT,
            FieldValue::List(items) => match items.first() {
                Some(first) => FieldType::ARRAY | (FieldType::of(first) - FieldType::ARRAY),
                None => FieldType::ARRAY,
            },
        }
    }

    /// A column type is resolved when it carries at least one kind besides `NULL`.
    pub fn is_resolved(&self) -> bool {
        !(*self - FieldType::NULL).is_empty()
    }

    /// Element kind of an `ARRAY` type.
    pub fn element(&self) -> FieldType {
        *self - FieldType::ARRAY
    }

    /// SQL column type used by the DDL builders.
    pub fn sql_type(&self) -> &'static str {
        let kind = self.element();
        if self.contains(FieldType::ARRAY) && kind.is_empty() {
            return "TEXT";
        }
        if kind.contains(FieldType::OBJECT) {
            "TEXT"
        } else if kind.contains(FieldType::STRING) {
            "TEXT"
        } else if kind.contains(FieldType::NUMBER) {
            "NUMERIC"
        } else if kind.contains(FieldType::BOOLEAN) {
            "BOOLEAN"
        } else if kind.contains(FieldType::DATE) {
            "DATETIME"
        } else if kind.contains(FieldType::GUID) {
            "TEXT"
        } else if kind.contains(FieldType::BLOB) {
            "BLOB"
        } else {
            "TEXT"
        }
    }
}

/// Strategy for the origin of a key column's value.
///
/// Columns that are not keys carry `None` in an `Option<PrimaryKeyType>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimaryKeyType {
    /// The caller supplies the value.
    Assigned,
    /// The backend assigns the value on insert.
    AutoIncrement,
    /// A new UUID is generated when the value is missing.
    Guid,
}

impl std::fmt::Display for PrimaryKeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimaryKeyType::Assigned => write!(f, "Assigned"),
            PrimaryKeyType::AutoIncrement => write!(f, "AutoIncrement"),
            PrimaryKeyType::Guid => write!(f, "Guid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_of_value() {
        assert_eq!(FieldType::of_value(&Value::Int(3)), FieldType::NUMBER);
        assert_eq!(FieldType::of_value(&Value::from("a")), FieldType::STRING);
        assert_eq!(FieldType::of_value(&Value::Null), FieldType::NULL);
    }

    #[test]
    fn test_list_kind() {
        let list = FieldValue::List(vec![FieldValue::Value(Value::from("x"))]);
        assert_eq!(FieldType::of(&list), FieldType::ARRAY | FieldType::STRING);
        assert_eq!(FieldType::of(&FieldValue::List(vec![])), FieldType::ARRAY);
    }

    #[test]
    fn test_is_resolved() {
        assert!(!FieldType::NULL.is_resolved());
        assert!(!FieldType::empty().is_resolved());
        assert!((FieldType::NULL | FieldType::STRING).is_resolved());
        assert_eq!((FieldType::ARRAY | FieldType::NUMBER).element(), FieldType::NUMBER);
    }
}
