//! Select trees and query requests.

use crate::filter::Filter;
use serde::{Deserialize, Serialize};

/// A node in a select tree: a column plus nested child selections.
///
/// Children are only meaningful on relationship columns; nesting follows
/// the relationship into the referenced table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Select {
    /// Column name on the current table.
    pub column: String,
    /// Ordered child selections on the referenced table.
    pub children: Vec<Select>,
}

impl Select {
    /// Select a single column.
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            children: Vec::new(),
        }
    }

    /// Add a child selection.
    pub fn with(mut self, child: Select) -> Self {
        self.children.push(child);
        self
    }

    /// Add plain-column children by name.
    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        self.children.extend(columns.iter().map(|c| Select::new(*c)));
        self
    }

    /// Check if this node selects through a relationship.
    pub fn is_nested(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

/// Order specification on a (possibly nested) column path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Path to order by.
    pub path: String,
    /// Sort direction.
    pub direction: OrderDirection,
}

impl OrderSpec {
    /// Ascending order on a path.
    pub fn asc(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Descending order on a path.
    pub fn desc(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            direction: OrderDirection::Desc,
        }
    }
}

/// A tree-shaped query request against one root table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Root table name.
    pub table: String,
    /// Nested selection. Empty means "all columns of the root table".
    pub select: Vec<Select>,
    /// Optional filter tree.
    pub filter: Option<Filter>,
    /// Free-text search terms, OR-combined across joined tables.
    pub search: Vec<String>,
    /// Ordering specification.
    pub order_by: Vec<OrderSpec>,
    /// Maximum number of root rows to return.
    pub limit: Option<u64>,
    /// Number of root rows to skip.
    pub offset: Option<u64>,
}

impl QueryRequest {
    /// Create a request selecting everything from a table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: Vec::new(),
            filter: None,
            search: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Add a selection node.
    pub fn select(mut self, node: Select) -> Self {
        self.select.push(node);
        self
    }

    /// Add plain-column selections by name.
    pub fn select_columns(mut self, columns: &[&str]) -> Self {
        self.select.extend(columns.iter().map(|c| Select::new(*c)));
        self
    }

    /// Set the filter tree.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Add a search term.
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search.push(term.into());
        self
    }

    /// Add an order specification.
    pub fn order_by(mut self, order: OrderSpec) -> Self {
        self.order_by.push(order);
        self
    }

    /// Set the row limit.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the row offset.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;

    #[test]
    fn test_select_tree() {
        let s = Select::new("uncle").with_columns(&["firstName", "lastName"]);
        assert!(s.is_nested());
        assert_eq!(s.children.len(), 2);
        assert!(!s.children[0].is_nested());
    }

    #[test]
    fn test_request_builder() {
        let request = QueryRequest::new("Person")
            .select_columns(&["firstName"])
            .select(Select::new("uncle").with_columns(&["firstName"]))
            .filter(Filter::eq("lastName", "Duck"))
            .search("duckburg")
            .order_by(OrderSpec::asc("lastName"))
            .limit(10);

        assert_eq!(request.table, "Person");
        assert_eq!(request.select.len(), 2);
        assert!(request.filter.is_some());
        assert_eq!(request.search, vec!["duckburg"]);
        assert_eq!(request.limit, Some(10));
    }
}
