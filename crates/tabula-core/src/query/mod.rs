//! Query compilation and execution.
//!
//! A request travels through four stages: path resolution against the
//! schema ([`path`]), join planning with deterministic aliases
//! ([`join`]), predicate compilation with literal coercion and
//! security injection ([`filter`], [`compiler`]), and nested result
//! assembly from the engine's flat rows ([`assemble`]).

pub mod assemble;
pub mod compiler;
pub mod executor;
pub mod filter;
pub mod join;
pub mod path;

pub use assemble::RowAssembler;
pub use compiler::QueryCompiler;
pub use executor::{Engine, MatchCondition, QueryExecutor};
pub use filter::FilterCompiler;
pub use join::JoinPlanner;
pub use path::{resolve, PathStep, ResolvedPath};
