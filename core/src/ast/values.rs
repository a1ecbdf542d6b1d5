use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::error::RowmapResult;
use crate::path::PropertyPath;

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    Date(DateTime<Utc>),
    Guid(Uuid),
    /// Binary data
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Date(d) => write!(f, "'{}'", d.to_rfc3339()),
            Value::Guid(u) => write!(f, "'{}'", u),
            Value::Blob(bytes) => {
                write!(f, "X'")?;
                for byte in bytes {
                    write!(f, "{:02x}", byte)?;
                }
                write!(f, "'")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Value::Date(Utc.from_utc_datetime(&d))
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        match d.and_hms_opt(0, 0, 0) {
            Some(midnight) => Value::from(midnight),
            None => Value::Null,
        }
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Guid(u)
    }
}

impl From<Blob> for Value {
    fn from(b: Blob) -> Self {
        Value::Blob(b.0)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// Binary column content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blob(pub Vec<u8>);

/// A property value inside a model snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Value(Value),
    /// Nested model.
    Object(Record),
    /// List-valued property, mapped through a dependency table.
    List(Vec<FieldValue>),
}

impl FieldValue {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            FieldValue::Object(r) => Some(r),
            _ => None,
        }
    }

    /// True for a null scalar or a nested model that was not set.
    pub fn is_absent(&self) -> bool {
        match self {
            FieldValue::Value(v) => v.is_null(),
            FieldValue::Object(r) => !r.present,
            FieldValue::List(_) => false,
        }
    }

    /// Convert into a bindable value. Composite values are bound as JSON text.
    pub fn to_bind_value(&self) -> RowmapResult<Value> {
        match self {
            FieldValue::Value(v) => Ok(v.clone()),
            FieldValue::Object(r) if !r.present => Ok(Value::Null),
            other => Ok(Value::String(serde_json::to_string(other)?)),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Value(v) => v.serialize(serializer),
            FieldValue::Object(r) => r.serialize(serializer),
            FieldValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

/// Ordered snapshot of a model instance: its type name and property values.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    type_name: String,
    fields: Vec<(String, FieldValue)>,
    present: bool,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
            present: true,
        }
    }

    /// Placeholder for a nested model that is not set (`None`).
    /// Keeps the type name so references can still be resolved.
    pub fn absent(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
            present: false,
        }
    }

    /// Append a property (builder style).
    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.set(name, value);
        self
    }

    /// Set a property, replacing an existing one in place.
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Follow a dotted path through nested records.
    pub fn value_at(&self, path: &PropertyPath) -> Option<&FieldValue> {
        let mut segments = path.segments().iter();
        let first = segments.next()?;
        let mut current = self.get(first)?;
        for segment in segments {
            current = current.as_record()?.get(segment)?;
        }
        Some(current)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if !self.present {
            return serializer.serialize_none();
        }
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Conversion of a struct field into a snapshot value.
pub trait IntoFieldValue {
    fn to_field_value(&self) -> FieldValue;

    /// Value used for `None`. Nested models override this to keep their type name.
    fn absent() -> FieldValue
    where
        Self: Sized,
    {
        FieldValue::Value(Value::Null)
    }
}

macro_rules! scalar_field_value {
    ($($ty:ty),*) => {
        $(
            impl IntoFieldValue for $ty {
                fn to_field_value(&self) -> FieldValue {
                    FieldValue::Value(Value::from(self.clone()))
                }
            }
        )*
    };
}

scalar_field_value!(
    bool, i32, i64, u32, f64, Decimal, String, DateTime<Utc>, NaiveDateTime, NaiveDate, Uuid, Blob
);

impl IntoFieldValue for i16 {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Value(Value::Int(*self as i64))
    }
}

impl IntoFieldValue for f32 {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Value(Value::Float(*self as f64))
    }
}

impl<T: IntoFieldValue> IntoFieldValue for Option<T> {
    fn to_field_value(&self) -> FieldValue {
        match self {
            Some(v) => v.to_field_value(),
            None => T::absent(),
        }
    }
}

impl<T: IntoFieldValue> IntoFieldValue for Vec<T> {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::List(self.iter().map(IntoFieldValue::to_field_value).collect())
    }
}

impl<T: IntoFieldValue> IntoFieldValue for Box<T> {
    fn to_field_value(&self) -> FieldValue {
        (**self).to_field_value()
    }

    fn absent() -> FieldValue {
        T::absent()
    }
}

/// A mappable model type.
///
/// `Default` provides the prototype instance whose current values drive type
/// inference while mapping. Implement through [`model!`](crate::model).
pub trait Model: Default {
    /// Type name, also the default table name.
    fn type_name() -> &'static str;

    /// Snapshot of the instance's properties in declaration order.
    fn to_record(&self) -> Record;
}

/// Implement [`Model`] and [`IntoFieldValue`] for a struct by listing its mapped fields.
///
/// ```ignore
/// #[derive(Default)]
/// struct Brand { id: i64, name: String }
/// rowmap_core::model!(Brand { id, name });
/// ```
#[macro_export]
macro_rules! model {
    ($ty:ident { $($field:ident),* $(,)? }) => {
        impl $crate::ast::Model for $ty {
            fn type_name() -> &'static str {
                stringify!($ty)
            }

            fn to_record(&self) -> $crate::ast::Record {
                $crate::ast::Record::new(stringify!($ty))
                    $(.with(
                        stringify!($field),
                        $crate::ast::IntoFieldValue::to_field_value(&self.$field),
                    ))*
            }
        }

        impl $crate::ast::IntoFieldValue for $ty {
            fn to_field_value(&self) -> $crate::ast::FieldValue {
                $crate::ast::FieldValue::Object($crate::ast::Model::to_record(self))
            }

            fn absent() -> $crate::ast::FieldValue {
                $crate::ast::FieldValue::Object($crate::ast::Record::absent(stringify!($ty)))
            }
        }
    };
}
