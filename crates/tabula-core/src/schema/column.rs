//! Column metadata and column types.

use serde::{Deserialize, Serialize};
use tabula_model::Value;

/// Column type: scalar kinds plus the four relationship kinds.
///
/// Relationship kinds carry no payload here; the referenced table and,
/// for back-references, the mirrored column live on [`Column`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// Short text.
    String,
    /// Long text. Participates in search, never in keys.
    Text,
    /// 64-bit integer.
    Int,
    /// Boolean.
    Bool,
    /// Floating-point number.
    Decimal,
    /// Calendar date.
    Date,
    /// Date with time of day.
    DateTime,
    /// UUID.
    Uuid,
    /// Single reference to another table's row.
    Ref,
    /// Ordered array of references to another table's rows.
    RefArray,
    /// Many-to-many reference through a derived link table.
    Mref,
    /// Derived, read-only reverse view of a `Ref` or `RefArray` column
    /// on the referenced table.
    Refback,
}

impl ColumnType {
    /// Whether this type addresses rows of another table.
    pub fn is_relationship(self) -> bool {
        matches!(
            self,
            ColumnType::Ref | ColumnType::RefArray | ColumnType::Mref | ColumnType::Refback
        )
    }

    /// Whether writes to this type must be checked against the
    /// referenced table.
    pub fn is_owned_reference(self) -> bool {
        matches!(self, ColumnType::Ref | ColumnType::RefArray | ColumnType::Mref)
    }

    /// Lowercase name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Text => "text",
            ColumnType::Int => "int",
            ColumnType::Bool => "bool",
            ColumnType::Decimal => "decimal",
            ColumnType::Date => "date",
            ColumnType::DateTime => "datetime",
            ColumnType::Uuid => "uuid",
            ColumnType::Ref => "ref",
            ColumnType::RefArray => "ref_array",
            ColumnType::Mref => "mref",
            ColumnType::Refback => "refback",
        }
    }
}

/// A column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name, unique within its table and inheritance chain.
    pub name: String,
    /// Column type.
    pub column_type: ColumnType,
    /// Whether null is accepted.
    pub nullable: bool,
    /// Whether the column rejects updates after insert.
    pub readonly: bool,
    /// Whether values must be unique across the table.
    pub unique: bool,
    /// Whether the column is part of the primary key.
    pub pkey: bool,
    /// Value applied on insert when the column is absent.
    pub default_value: Option<Value>,
    /// Referenced table, for relationship columns.
    pub ref_table: Option<String>,
    /// For `Refback`: name of the `Ref`/`RefArray` column on
    /// `ref_table` that this column mirrors.
    pub refback_via: Option<String>,
}

impl Column {
    /// Create a nullable, writable column of the given type.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            readonly: false,
            unique: false,
            pkey: false,
            default_value: None,
            ref_table: None,
            refback_via: None,
        }
    }

    /// Mark as part of the primary key. Key columns are required and
    /// readonly.
    pub fn pkey(mut self) -> Self {
        self.pkey = true;
        self.nullable = false;
        self.readonly = true;
        self
    }

    /// Mark as required.
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Mark as readonly after insert.
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    /// Mark as unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set the insert default.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Set the referenced table of a relationship column.
    pub fn references(mut self, table: impl Into<String>) -> Self {
        self.ref_table = Some(table.into());
        self
    }

    /// Set the target table and mirrored column of a back-reference.
    pub fn refback(mut self, table: impl Into<String>, via: impl Into<String>) -> Self {
        self.ref_table = Some(table.into());
        self.refback_via = Some(via.into());
        self
    }

    /// Whether this column addresses rows of another table.
    pub fn is_relationship(&self) -> bool {
        self.column_type.is_relationship()
    }
}
