//! Tabula Core - Schema metadata, query compilation, and constraint
//! enforcement.
//!
//! This crate compiles path-addressed requests against runtime-defined
//! schemas into engine-ready plans, and validates writes into atomic
//! batches. Physical execution lives behind the [`query::Engine`]
//! trait.

pub mod constraint;
pub mod error;
pub mod query;
pub mod schema;
pub mod security;

pub use constraint::{ConstraintEnforcer, TransactionState, WriteTransaction};
pub use error::{
    CoercionError, Error, ExecutionError, IntegrityError, PathError, Result, SchemaError,
};
pub use query::{
    Engine, FilterCompiler, JoinPlanner, MatchCondition, QueryCompiler, QueryExecutor,
    RowAssembler,
};
pub use schema::{
    Column, ColumnType, RefComponent, SchemaMetadata, SchemaRegistry, TableMetadata,
};
pub use security::{AccessContext, Identity, Role, SchemaRoles, ANONYMOUS_ROLE};

/// Re-export shared model types.
pub use tabula_model as model;
