//! Runtime-defined schema metadata.
//!
//! Schemas are data, not code: tables, columns, keys, inheritance, and
//! relationship kinds are created and validated at runtime, then shared
//! immutably with the query and constraint layers through the
//! [`SchemaRegistry`].

mod column;
mod registry;
mod schema;
mod table;

pub use column::{Column, ColumnType};
pub use registry::SchemaRegistry;
pub use schema::{RefComponent, SchemaMetadata};
pub use table::TableMetadata;
