//! Path-keyed rows used both as mutation input and flat query output.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// An ordered mapping from path to value.
///
/// Paths address columns through relationships, e.g. `uncle/firstName`.
/// `/` and `.` are interchangeable separators on input; lookups normalize
/// both to `/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

/// Normalize a path to its canonical `/`-separated form.
pub fn normalize_path(path: &str) -> String {
    path.replace('.', "/")
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Set a value, replacing any existing value at the same path.
    pub fn set(&mut self, path: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let path = normalize_path(&path.into());
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(p, _)| *p == path) {
            slot.1 = value;
        } else {
            self.fields.push((path, value));
        }
        self
    }

    /// Builder-style `set`.
    pub fn with(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(path, value);
        self
    }

    /// Get a value by path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let path = normalize_path(path);
        self.fields.iter().find(|(p, _)| *p == path).map(|(_, v)| v)
    }

    /// Get a value as a string, if present and string-typed.
    pub fn get_string(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Check whether a path is present (even if null).
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Iterate over `(path, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(p, v)| (p.as_str(), v))
    }

    /// All paths in insertion order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(p, _)| p.as_str())
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut row = Row::new();
        for (path, value) in iter {
            row.set(path, value);
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get() {
        let row = Row::new()
            .with("firstName", "Donald")
            .with("uncle/firstName", "Scrooge");

        assert_eq!(row.get_string("firstName"), Some("Donald"));
        assert_eq!(row.get_string("uncle/firstName"), Some("Scrooge"));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn test_dot_and_slash_are_equivalent() {
        let row = Row::new().with("uncle.firstName", "Scrooge");
        assert_eq!(row.get_string("uncle/firstName"), Some("Scrooge"));
        assert!(row.contains("uncle.firstName"));
    }

    #[test]
    fn test_set_replaces() {
        let mut row = Row::new();
        row.set("name", "a");
        row.set("name", "b");
        assert_eq!(row.len(), 1);
        assert_eq!(row.get_string("name"), Some("b"));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let row = Row::new().with("b", 1i64).with("a", 2i64);
        let paths: Vec<_> = row.paths().collect();
        assert_eq!(paths, vec!["b", "a"]);
    }
}
