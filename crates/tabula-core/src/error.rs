//! Core error types.

use thiserror::Error;

/// Top-level compiler error.
#[derive(Debug, Error)]
pub enum Error {
    /// Schema definition or lookup error.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Path resolution error.
    #[error(transparent)]
    Path(#[from] PathError),

    /// Value coercion error.
    #[error(transparent)]
    Coercion(#[from] CoercionError),

    /// Write-time constraint violation.
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// Execution engine error.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Transaction used after it was closed.
    #[error("transaction is {state}, no further operations accepted")]
    TransactionClosed {
        /// Terminal state the transaction reached.
        state: &'static str,
    },
}

/// Schema definition and lookup errors.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    /// Named table does not exist.
    #[error("undefined_table: table '{table}' does not exist in schema '{schema}'")]
    UnknownTable {
        /// Schema searched.
        schema: String,
        /// Missing table name.
        table: String,
    },

    /// Named column does not exist on the table.
    #[error("undefined_column: column '{column}' does not exist on table '{table}'")]
    UnknownColumn {
        /// Table searched, inheritance chain included.
        table: String,
        /// Missing column name.
        column: String,
    },

    /// Table name already taken.
    #[error("duplicate_table: table '{table}' already exists")]
    DuplicateTable {
        /// Conflicting table name.
        table: String,
    },

    /// Column name already taken on the table.
    #[error("duplicate_column: column '{column}' already exists on table '{table}'")]
    DuplicateColumn {
        /// Table holding the conflict.
        table: String,
        /// Conflicting column name.
        column: String,
    },

    /// Inheritance parent missing, cyclic, or otherwise unusable.
    #[error("invalid_inheritance: table '{table}' cannot inherit from '{parent}': {reason}")]
    InvalidInheritance {
        /// Inheriting table.
        table: String,
        /// Declared parent.
        parent: String,
        /// What went wrong.
        reason: String,
    },

    /// Relationship column without a valid target.
    #[error("invalid_reference: column '{column}' on table '{table}': {reason}")]
    InvalidReference {
        /// Table holding the column.
        table: String,
        /// Offending column.
        column: String,
        /// What went wrong.
        reason: String,
    },

    /// Back-reference column whose `via` column is missing or not a
    /// forward reference back to this table.
    #[error("invalid_refback: column '{column}' on table '{table}': {reason}")]
    InvalidRefback {
        /// Table holding the column.
        table: String,
        /// Offending column.
        column: String,
        /// What went wrong.
        reason: String,
    },

    /// Table without a primary key.
    #[error("missing_key: table '{table}' defines no primary key column")]
    MissingKey {
        /// Offending table.
        table: String,
    },

    /// Table cannot be dropped while others depend on it.
    #[error("table_in_use: table '{table}' is still used by table '{via_table}'")]
    TableInUse {
        /// Table being dropped.
        table: String,
        /// Table inheriting from or referencing it.
        via_table: String,
    },
}

/// Errors resolving a path expression against the schema.
#[derive(Debug, Error, PartialEq)]
pub enum PathError {
    /// A path segment names no column on the table reached so far.
    #[error("undefined_column: unknown segment '{segment}' at table '{table}' in path '{path}'")]
    UnknownSegment {
        /// Full path as given.
        path: String,
        /// Table the segment was looked up on.
        table: String,
        /// Offending segment.
        segment: String,
    },

    /// An intermediate segment is not a relationship column.
    #[error("invalid_path: segment '{segment}' of path '{path}' is not a relationship column")]
    NotARelationship {
        /// Full path as given.
        path: String,
        /// Offending segment.
        segment: String,
    },

    /// A relationship with a composite key was filtered by bare
    /// values; composite keys need one path per key column.
    #[error("invalid_path: relationship '{segment}' in path '{path}' has a composite key; filter its key columns explicitly")]
    CompositeKeyLeaf {
        /// Full path as given.
        path: String,
        /// Relationship segment.
        segment: String,
    },

    /// Empty path expression.
    #[error("invalid_path: empty path")]
    Empty,
}

/// A literal cannot be coerced to a column's type.
#[derive(Debug, Error, PartialEq)]
#[error("invalid_value: cannot coerce {got} value to {expected} for column '{column}'")]
pub struct CoercionError {
    /// Column the literal was bound to.
    pub column: String,
    /// Column type name.
    pub expected: &'static str,
    /// Literal type name.
    pub got: &'static str,
}

/// Write-time constraint violations.
#[derive(Debug, Error, PartialEq)]
pub enum IntegrityError {
    /// Referenced row does not exist.
    #[error("foreign_key_violation: column '{column}' on table '{table}' references a row that does not exist in '{target}'")]
    MissingReference {
        /// Table being written.
        table: String,
        /// Reference column.
        column: String,
        /// Referenced table.
        target: String,
    },

    /// Only some components of a composite reference were provided.
    #[error("partial_key: composite reference '{column}' on table '{table}' must set all components or none")]
    PartialKey {
        /// Table being written.
        table: String,
        /// Reference column.
        column: String,
    },

    /// Non-nullable column missing on insert.
    #[error("not_null_violation: column '{column}' on table '{table}' is required")]
    RequiredMissing {
        /// Table being written.
        table: String,
        /// Required column.
        column: String,
    },

    /// Unique column value already present.
    #[error("unique_violation: column '{column}' on table '{table}' must be unique")]
    UniqueViolation {
        /// Table being written.
        table: String,
        /// Unique column.
        column: String,
    },

    /// Row is still referenced and cannot be deleted.
    #[error("delete_blocked: row in '{table}' is still referenced by column '{via_column}' of table '{via_table}'")]
    DeleteBlocked {
        /// Table of the row being deleted.
        table: String,
        /// Referencing table.
        via_table: String,
        /// Referencing column.
        via_column: String,
    },

    /// Back-reference columns are derived and never writable.
    #[error("readonly_violation: column '{column}' on table '{table}' is a derived back-reference; write through '{via_table}.{via_column}' instead")]
    RefbackWrite {
        /// Table being written.
        table: String,
        /// Back-reference column.
        column: String,
        /// Table owning the forward reference.
        via_table: String,
        /// Forward reference column.
        via_column: String,
    },

    /// Readonly column changed on update.
    #[error("readonly_violation: column '{column}' on table '{table}' is readonly")]
    ReadonlyWrite {
        /// Table being written.
        table: String,
        /// Readonly column.
        column: String,
    },

    /// Identity lacks a role that permits the write.
    #[error("permission_denied: identity has no role permitting writes to table '{table}'")]
    PermissionDenied {
        /// Table being written.
        table: String,
    },
}

/// Failure reported by the execution engine.
///
/// The compiler does not interpret engine failures; it preserves the
/// cause for the caller and rolls back the surrounding transaction.
#[derive(Debug, Error)]
#[error("execution failed: {message}")]
pub struct ExecutionError {
    /// Human-readable description.
    pub message: String,
    /// Underlying engine error, if one was preserved.
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ExecutionError {
    /// Build from a message alone.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    /// Build from a message and an underlying cause.
    pub fn with_cause(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
