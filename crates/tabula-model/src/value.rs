//! Runtime value types shared by the compiler and the execution engine.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A runtime value holding either a scalar or an array of scalars.
///
/// This enum represents every value that can appear in a row, a filter,
/// or a compiled predicate. Arrays are typed (e.g. `IntArray`) rather
/// than nested, because relationship columns store arrays of key
/// components, never arrays of arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point.
    Decimal(f64),
    /// UTF-8 string.
    String(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time without timezone.
    DateTime(NaiveDateTime),
    /// UUID as 16 bytes.
    Uuid([u8; 16]),
    /// Array of booleans.
    BoolArray(Vec<bool>),
    /// Array of 64-bit integers.
    IntArray(Vec<i64>),
    /// Array of 64-bit floats.
    DecimalArray(Vec<f64>),
    /// Array of strings.
    StringArray(Vec<String>),
    /// Array of dates.
    DateArray(Vec<NaiveDate>),
    /// Array of datetimes.
    DateTimeArray(Vec<NaiveDateTime>),
    /// Array of UUIDs.
    UuidArray(Vec<[u8; 16]>),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is an array type.
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Value::BoolArray(_)
                | Value::IntArray(_)
                | Value::DecimalArray(_)
                | Value::StringArray(_)
                | Value::DateArray(_)
                | Value::DateTimeArray(_)
                | Value::UuidArray(_)
        )
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as f64. Integers widen.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Decimal(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Number of elements if this is an array.
    pub fn array_len(&self) -> Option<usize> {
        match self {
            Value::BoolArray(v) => Some(v.len()),
            Value::IntArray(v) => Some(v.len()),
            Value::DecimalArray(v) => Some(v.len()),
            Value::StringArray(v) => Some(v.len()),
            Value::DateArray(v) => Some(v.len()),
            Value::DateTimeArray(v) => Some(v.len()),
            Value::UuidArray(v) => Some(v.len()),
            _ => None,
        }
    }

    /// Split an array value into its scalar elements.
    ///
    /// Scalars yield a single-element vec, null yields an empty one.
    pub fn into_elements(self) -> Vec<Value> {
        match self {
            Value::Null => vec![],
            Value::BoolArray(v) => v.into_iter().map(Value::Bool).collect(),
            Value::IntArray(v) => v.into_iter().map(Value::Int).collect(),
            Value::DecimalArray(v) => v.into_iter().map(Value::Decimal).collect(),
            Value::StringArray(v) => v.into_iter().map(Value::String).collect(),
            Value::DateArray(v) => v.into_iter().map(Value::Date).collect(),
            Value::DateTimeArray(v) => v.into_iter().map(Value::DateTime).collect(),
            Value::UuidArray(v) => v.into_iter().map(Value::Uuid).collect(),
            scalar => vec![scalar],
        }
    }

    /// Human-readable name of the value's runtime type, used in errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Uuid(_) => "uuid",
            Value::BoolArray(_) => "bool[]",
            Value::IntArray(_) => "int[]",
            Value::DecimalArray(_) => "decimal[]",
            Value::StringArray(_) => "string[]",
            Value::DateArray(_) => "date[]",
            Value::DateTimeArray(_) => "datetime[]",
            Value::UuidArray(_) => "uuid[]",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_accessors() {
        assert_eq!(Value::Int(7).as_i64(), Some(7));
        assert_eq!(Value::Int(7).as_f64(), Some(7.0));
        assert_eq!(Value::Decimal(1.5).as_f64(), Some(1.5));
        assert_eq!(Value::String("x".into()).as_str(), Some("x"));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert!(Value::Null.is_null());
    }

    #[test]
    fn test_array_detection() {
        assert!(Value::StringArray(vec!["a".into()]).is_array());
        assert!(!Value::String("a".into()).is_array());
        assert_eq!(Value::IntArray(vec![1, 2, 3]).array_len(), Some(3));
        assert_eq!(Value::Int(1).array_len(), None);
    }

    #[test]
    fn test_into_elements() {
        let elems = Value::StringArray(vec!["a".into(), "b".into()]).into_elements();
        assert_eq!(elems, vec![Value::String("a".into()), Value::String("b".into())]);

        assert_eq!(Value::Int(1).into_elements(), vec![Value::Int(1)]);
        assert!(Value::Null.into_elements().is_empty());
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(Value::from("hi"), Value::String("hi".into()));
        assert_eq!(Value::from(3i64), Value::Int(3));
        assert_eq!(Value::from(true), Value::Bool(true));
    }
}
