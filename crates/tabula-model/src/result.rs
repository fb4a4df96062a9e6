//! Nested result records assembled from flat engine rows.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// One field value in a record: either a scalar or a nested row set.
///
/// Relationship fields are always `Rows`, even when the relationship
/// kind guarantees at most one match; an absent relationship is an
/// empty `Rows`, never `Value(Null)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Nested {
    /// A scalar or array value.
    Value(Value),
    /// Nested records of a traversed relationship.
    Rows(Vec<Record>),
}

impl Nested {
    /// The scalar value, if this field is one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Nested::Value(v) => Some(v),
            Nested::Rows(_) => None,
        }
    }

    /// The nested records, if this field is a relationship.
    pub fn as_rows(&self) -> Option<&[Record]> {
        match self {
            Nested::Rows(rows) => Some(rows),
            Nested::Value(_) => None,
        }
    }
}

/// One assembled record: named fields in select order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<(String, Nested)>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any existing value under the same name.
    pub fn set(&mut self, name: impl Into<String>, value: Nested) {
        let name = name.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: Nested) -> Self {
        self.set(name, value);
        self
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&Nested> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Fields in select order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Nested)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut record = Record::new()
            .with("name", Nested::Value(Value::String("kwik".into())))
            .with("age", Nested::Value(Value::Int(8)));
        record.set("name", Nested::Value(Value::String("kwek".into())));

        assert_eq!(record.len(), 2);
        assert_eq!(
            record.get("name"),
            Some(&Nested::Value(Value::String("kwek".into())))
        );
        assert_eq!(record.fields().next().map(|(n, _)| n), Some("name"));
    }

    #[test]
    fn test_absent_relationship_is_empty_rows() {
        let record = Record::new().with("cousins", Nested::Rows(vec![]));
        let nested = record.get("cousins").unwrap();
        assert_eq!(nested.as_rows(), Some(&[][..]));
        assert!(nested.as_value().is_none());
    }
}
