//! Compiled query plan IR.
//!
//! The compiler produces a complete plan before any engine call is made:
//! a select list with table aliases, an ordered left-join sequence, one
//! combined predicate, and order/limit. The execution engine renders it
//! into its own dialect; nothing here assumes a specific engine beyond
//! relational joins, array overlap tests, and ranked text search.

use crate::select::OrderDirection;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Name of the precomputed per-table search vector column.
pub const SEARCH_COLUMN: &str = "_search_text";

/// Name of the per-row security tag column on RLS-enabled tables.
pub const ROW_ROLE_COLUMN: &str = "_access_role";

/// The derived link table of a many-to-many column.
///
/// Link tables are first-class plan constructs, not user-visible schema.
/// Column pairs map link-table columns to the owning/target tables' key
/// columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MrefLink {
    /// Physical name of the link table.
    pub table: String,
    /// Table owning the many-to-many column.
    pub owner_table: String,
    /// Pairs of (link-table column, owner primary-key column).
    pub owner_key: Vec<(String, String)>,
    /// Referenced table.
    pub target_table: String,
    /// Pairs of (link-table column, target primary-key column).
    pub target_key: Vec<(String, String)>,
}

/// One projected column in the select list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectField {
    /// Table alias the column is read from.
    pub alias: String,
    /// Physical column name.
    pub column: String,
    /// Output path in the flat result row, e.g. `uncle/firstName`.
    pub output: String,
}

/// How a joined table relates to the alias it is joined from.
///
/// Every variant is a LEFT join: absent relationships project as nulls
/// and never narrow the root selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JoinKind {
    /// Component-wise equality: `alias.right = from_alias.left` for each
    /// pair. Covers single-reference joins and link-table hops.
    Ref {
        /// Pairs of (column on `from_alias`, column on the joined alias).
        on: Vec<(String, String)>,
    },
    /// Element-aligned array membership: some index `i` of the
    /// from-side arrays satisfies `alias.right = from_alias.left[i]`
    /// for every pair at once. Composite reference arrays store one
    /// array per key component and match positionally, never
    /// component-independently; the single-pair case reduces to
    /// `alias.right = ANY(from_alias.left)`.
    RefArray {
        /// Pairs of (array column on `from_alias`, column on the joined alias).
        on: Vec<(String, String)>,
    },
    /// Reverse of `RefArray`: some index `i` of the joined-side arrays
    /// satisfies `from_alias.left = alias.right[i]` for every pair at
    /// once. Used by derived back-references.
    RefbackArray {
        /// Pairs of (column on `from_alias`, array column on the joined alias).
        on: Vec<(String, String)>,
    },
}

/// One joined table instance in the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    /// Physical table to join.
    pub table: String,
    /// Alias assigned to this instance.
    pub alias: String,
    /// Alias the join condition refers back to.
    pub from_alias: String,
    /// Join shape.
    pub kind: JoinKind,
}

/// A predicate tree over aliased columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// Set membership: the column's value equals one of the literals.
    In {
        /// Table alias.
        alias: String,
        /// Physical column name.
        column: String,
        /// Literal values.
        values: Vec<Value>,
    },
    /// Array overlap: the array column intersects the literals.
    Overlaps {
        /// Table alias.
        alias: String,
        /// Physical array column name.
        column: String,
        /// Literal values.
        values: Vec<Value>,
    },
    /// Overlap against the two-hop link-table subselect of a
    /// many-to-many column.
    MrefOverlaps {
        /// Alias of the owning row's table.
        alias: String,
        /// Link table description.
        link: MrefLink,
        /// Literal target-key values.
        values: Vec<Value>,
    },
    /// Ranked full-text match of the alias's search vector column
    /// against the OR-combined terms.
    SearchMatches {
        /// Table alias.
        alias: String,
        /// Search terms.
        terms: Vec<String>,
    },
    /// Row visibility: the row's security tag column intersects the
    /// given role set.
    RoleVisible {
        /// Table alias.
        alias: String,
        /// Roles the acting identity can see.
        roles: Vec<String>,
    },
    /// All children hold.
    And(Vec<Predicate>),
    /// At least one child holds.
    Or(Vec<Predicate>),
    /// The child does not hold.
    Not(Box<Predicate>),
}

impl Predicate {
    /// AND-combine two optional predicates.
    pub fn combine(a: Option<Predicate>, b: Option<Predicate>) -> Option<Predicate> {
        match (a, b) {
            (None, None) => None,
            (Some(p), None) | (None, Some(p)) => Some(p),
            (Some(a), Some(b)) => Some(Predicate::And(vec![a, b])),
        }
    }
}

/// An order-by entry resolved to an alias and physical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderField {
    /// Table alias.
    pub alias: String,
    /// Physical column name.
    pub column: String,
    /// Sort direction.
    pub direction: OrderDirection,
}

/// A complete, engine-ready query plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    /// Schema the plan addresses.
    pub schema: String,
    /// Root table name (also the root alias).
    pub root_table: String,
    /// Select list in output order.
    pub select: Vec<SelectField>,
    /// Left joins, each from-alias preceding its dependents.
    pub joins: Vec<Join>,
    /// Combined filter + search + security predicate, if any.
    pub predicate: Option<Predicate>,
    /// Resolved ordering.
    pub order_by: Vec<OrderField>,
    /// Root row limit.
    pub limit: Option<u64>,
    /// Root row offset.
    pub offset: Option<u64>,
}

impl QueryPlan {
    /// All aliases used by the plan: the root plus every join alias.
    pub fn aliases(&self) -> Vec<&str> {
        let mut aliases = vec![self.root_table.as_str()];
        aliases.extend(self.joins.iter().map(|j| j.alias.as_str()));
        aliases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_predicates() {
        let a = Predicate::In {
            alias: "Person".into(),
            column: "firstName".into(),
            values: vec![Value::String("Donald".into())],
        };
        let b = Predicate::RoleVisible {
            alias: "Person".into(),
            roles: vec!["viewer".into()],
        };

        assert_eq!(Predicate::combine(None, None), None);
        assert_eq!(Predicate::combine(Some(a.clone()), None), Some(a.clone()));
        match Predicate::combine(Some(a), Some(b)) {
            Some(Predicate::And(children)) => assert_eq!(children.len(), 2),
            _ => panic!("expected And"),
        }
    }

    #[test]
    fn test_plan_aliases() {
        let plan = QueryPlan {
            schema: "test".into(),
            root_table: "Person".into(),
            select: vec![],
            joins: vec![Join {
                table: "Person".into(),
                alias: "Person/uncle".into(),
                from_alias: "Person".into(),
                kind: JoinKind::Ref { on: vec![] },
            }],
            predicate: None,
            order_by: vec![],
            limit: None,
            offset: None,
        };

        assert_eq!(plan.aliases(), vec!["Person", "Person/uncle"]);
    }
}
