//! Filter trees for query requests.
//!
//! A filter is either a leaf condition on a path, a boolean combinator,
//! or a subtree scoped under a relationship path. The type is recursive,
//! so it uses serde rather than a zero-copy format.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Comparison operators supported on filter leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    /// Set membership: true if the column value equals any of the
    /// supplied literals.
    Equals,
    /// Overlap: true if the column's value set intersects the supplied
    /// values. Used for array and many-to-many columns.
    Any,
}

/// A nested boolean filter over path-addressed columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// A single condition on a (possibly nested) column path.
    Leaf {
        /// Path to the column, relative to the current scope.
        path: String,
        /// Comparison operator.
        op: Operator,
        /// Literal values to compare against.
        values: Vec<Value>,
    },
    /// All children must match.
    And(Vec<Filter>),
    /// At least one child must match.
    Or(Vec<Filter>),
    /// The child must not match.
    Not(Box<Filter>),
    /// A subtree evaluated relative to a relationship path,
    /// e.g. "on `uncle`, where ...".
    Scoped {
        /// Relationship path the subtree is relative to.
        path: String,
        /// The scoped filter.
        filter: Box<Filter>,
    },
}

impl Filter {
    /// Leaf condition `path EQUALS values`.
    pub fn equals(path: impl Into<String>, values: Vec<Value>) -> Self {
        Filter::Leaf {
            path: path.into(),
            op: Operator::Equals,
            values,
        }
    }

    /// Leaf condition `path EQUALS value` with a single literal.
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::equals(path, vec![value.into()])
    }

    /// Leaf condition `path ANY values` (overlap).
    pub fn any(path: impl Into<String>, values: Vec<Value>) -> Self {
        Filter::Leaf {
            path: path.into(),
            op: Operator::Any,
            values,
        }
    }

    /// AND combinator.
    pub fn and(children: Vec<Filter>) -> Self {
        Filter::And(children)
    }

    /// OR combinator.
    pub fn or(children: Vec<Filter>) -> Self {
        Filter::Or(children)
    }

    /// NOT combinator.
    pub fn not(child: Filter) -> Self {
        Filter::Not(Box::new(child))
    }

    /// Scope a filter under a relationship path.
    pub fn scoped(path: impl Into<String>, filter: Filter) -> Self {
        Filter::Scoped {
            path: path.into(),
            filter: Box::new(filter),
        }
    }

    /// An empty filter tree matches everything.
    pub fn is_empty(&self) -> bool {
        match self {
            Filter::And(children) | Filter::Or(children) => {
                children.iter().all(Filter::is_empty)
            }
            Filter::Scoped { filter, .. } => filter.is_empty(),
            Filter::Leaf { .. } | Filter::Not(_) => false,
        }
    }
}
