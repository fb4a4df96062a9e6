//! Table metadata.

use super::column::Column;
use serde::{Deserialize, Serialize};

/// A table definition.
///
/// A table either declares its own primary key or inherits one through
/// `inherit`; subtables share the root table's key and may not declare
/// their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Table name, unique within the schema.
    pub name: String,
    /// Parent table, if this table extends one.
    pub inherit: Option<String>,
    /// Columns declared directly on this table.
    pub columns: Vec<Column>,
    /// Whether rows carry a per-row security tag.
    pub row_security: bool,
}

impl TableMetadata {
    /// Create a table with no columns.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inherit: None,
            columns: Vec::new(),
            row_security: false,
        }
    }

    /// Set the parent table.
    pub fn inherits(mut self, parent: impl Into<String>) -> Self {
        self.inherit = Some(parent.into());
        self
    }

    /// Add a column.
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Enable the per-row security tag. The flag is sticky: subtables
    /// of a tagged table are tagged as well.
    pub fn with_row_security(mut self) -> Self {
        self.row_security = true;
        self
    }

    /// Look up a column declared directly on this table.
    pub fn local_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary-key columns declared directly on this table.
    pub fn local_pkey(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.pkey).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;

    #[test]
    fn test_local_lookup() {
        let table = TableMetadata::new("Person")
            .with_column(Column::new("firstName", ColumnType::String).pkey())
            .with_column(Column::new("lastName", ColumnType::String).pkey())
            .with_column(Column::new("age", ColumnType::Int));

        assert!(table.local_column("age").is_some());
        assert!(table.local_column("missing").is_none());
        let pkey: Vec<_> = table.local_pkey().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(pkey, vec!["firstName", "lastName"]);
    }
}
