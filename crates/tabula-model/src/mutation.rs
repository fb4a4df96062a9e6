//! Write operations handed to the execution engine.

use crate::row::Row;
use serde::{Deserialize, Serialize};

/// A single validated write against one physical table.
///
/// Operations reference physical tables only: inheritance chains and
/// many-to-many link tables have already been expanded by validation,
/// so the engine applies each op literally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WriteOp {
    /// Insert one row.
    Insert {
        /// Physical table name.
        table: String,
        /// Column values.
        values: Row,
    },
    /// Update the row addressed by `key` with the given values.
    Update {
        /// Physical table name.
        table: String,
        /// Primary-key columns of the row.
        key: Row,
        /// Columns to change.
        values: Row,
    },
    /// Delete the row addressed by `key`.
    Delete {
        /// Physical table name.
        table: String,
        /// Primary-key columns of the row.
        key: Row,
    },
}

impl WriteOp {
    /// Physical table this op targets.
    pub fn table(&self) -> &str {
        match self {
            WriteOp::Insert { table, .. } => table,
            WriteOp::Update { table, .. } => table,
            WriteOp::Delete { table, .. } => table,
        }
    }
}

/// An ordered set of writes applied atomically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one op.
    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    /// Append all ops of another batch, preserving order.
    pub fn extend(&mut self, other: WriteBatch) {
        self.ops.extend(other.ops);
    }

    /// Ops in application order.
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Number of ops in the batch.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the batch holds no ops.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl FromIterator<WriteOp> for WriteBatch {
    fn from_iter<I: IntoIterator<Item = WriteOp>>(iter: I) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_batch_preserves_order() {
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::Insert {
            table: "Person".into(),
            values: Row::new().with("firstName", Value::String("Donald".into())),
        });
        batch.push(WriteOp::Delete {
            table: "Pet".into(),
            key: Row::new().with("name", Value::String("pooky".into())),
        });

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.ops()[0].table(), "Person");
        assert_eq!(batch.ops()[1].table(), "Pet");
    }

    #[test]
    fn test_extend() {
        let mut a: WriteBatch = [WriteOp::Delete {
            table: "Order".into(),
            key: Row::new().with("id", Value::Int(1)),
        }]
        .into_iter()
        .collect();
        let b: WriteBatch = [WriteOp::Delete {
            table: "User".into(),
            key: Row::new().with("id", Value::Int(2)),
        }]
        .into_iter()
        .collect();

        a.extend(b);
        assert_eq!(a.ops()[1].table(), "User");
    }
}
