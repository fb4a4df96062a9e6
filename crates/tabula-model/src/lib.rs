//! Tabula shared model types.
//!
//! This crate defines the types exchanged between the query/constraint
//! compiler and its callers: path-addressed requests, compiled plans,
//! write batches, and assembled result records.
//!
//! # Modules
//!
//! - [`value`] - Runtime value types for column data and query literals
//! - [`row`] - Path-keyed flat rows exchanged with the execution engine
//! - [`filter`] - Path-addressed filter trees
//! - [`select`] - Nested select trees and query requests
//! - [`plan`] - Compiled, engine-ready query plans
//! - [`mutation`] - Validated write operations
//! - [`result`] - Nested result records
//!
//! # Serialization
//!
//! All types derive `serde::Serialize` and `serde::Deserialize`, so an
//! API layer can carry requests and results in whatever encoding it
//! prefers:
//!
//! ```
//! use tabula_model::{Filter, QueryRequest};
//!
//! let request = QueryRequest::new("Person")
//!     .select_columns(&["firstName", "lastName"])
//!     .filter(Filter::eq("uncle/lastName", "Duck"));
//! let json = serde_json::to_string(&request).unwrap();
//! let back: QueryRequest = serde_json::from_str(&json).unwrap();
//! assert_eq!(request, back);
//! ```

pub mod filter;
pub mod mutation;
pub mod plan;
pub mod result;
pub mod row;
pub mod select;
pub mod value;

// Re-export commonly used types at crate root
pub use filter::{Filter, Operator};
pub use mutation::{WriteBatch, WriteOp};
pub use plan::{
    Join, JoinKind, MrefLink, OrderField, Predicate, QueryPlan, SelectField, ROW_ROLE_COLUMN,
    SEARCH_COLUMN,
};
pub use result::{Nested, Record};
pub use row::{normalize_path, Row};
pub use select::{OrderDirection, OrderSpec, QueryRequest, Select};
pub use value::Value;
