//! Execution engine contract and the read path built on it.

use crate::error::{ExecutionError, Result};
use crate::query::assemble::RowAssembler;
use crate::query::compiler::QueryCompiler;
use crate::schema::SchemaMetadata;
use crate::security::AccessContext;
use tabula_model::{QueryPlan, QueryRequest, Record, Row, Value, WriteBatch};
use tracing::debug;

/// One condition for reference probes.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchCondition {
    /// Scalar equality on a single column.
    Equals {
        /// Physical column name.
        column: String,
        /// Value to match.
        value: Value,
    },
    /// Element-aligned containment across parallel array columns: the
    /// row matches when some index holds every (column, value) pair at
    /// once. Composite reference arrays store one array per key
    /// component, so their components must match at the same position,
    /// never independently.
    ContainsTuple {
        /// Pairs of (array column, element value).
        components: Vec<(String, Value)>,
    },
}

impl MatchCondition {
    /// Equality condition.
    pub fn equals(column: impl Into<String>, value: Value) -> Self {
        MatchCondition::Equals {
            column: column.into(),
            value,
        }
    }

    /// Element-aligned containment condition.
    pub fn contains_tuple(components: Vec<(String, Value)>) -> Self {
        MatchCondition::ContainsTuple { components }
    }
}

/// The storage/execution engine this crate compiles for.
///
/// The compiler owns planning and constraint semantics; the engine owns
/// physical execution. Implementations run plans, probe rows by key,
/// count referencing rows, and apply validated write batches
/// atomically.
pub trait Engine: Send + Sync {
    /// Run a plan and return flat rows keyed by the plan's output
    /// paths, one row per join combination.
    fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Row>, ExecutionError>;

    /// Whether a row with the given key columns exists.
    fn exists(&self, table: &str, key: &Row) -> Result<bool, ExecutionError>;

    /// Count rows matching all conditions.
    fn count_matching(
        &self,
        table: &str,
        conditions: &[MatchCondition],
    ) -> Result<u64, ExecutionError>;

    /// Apply a validated batch atomically: all ops or none.
    fn apply(&self, batch: &WriteBatch) -> Result<(), ExecutionError>;
}

/// The read path: compile, fetch, assemble.
#[derive(Debug, Clone, Copy)]
pub struct QueryExecutor<'a, E: Engine> {
    schema: &'a SchemaMetadata,
    engine: &'a E,
}

impl<'a, E: Engine> QueryExecutor<'a, E> {
    pub fn new(schema: &'a SchemaMetadata, engine: &'a E) -> Self {
        Self { schema, engine }
    }

    /// Run one request under the given access context and return
    /// nested records.
    pub fn query(
        &self,
        request: &QueryRequest,
        context: &AccessContext,
    ) -> Result<Vec<Record>> {
        let plan = QueryCompiler::new(self.schema).compile(request, context)?;
        let rows = self.engine.fetch(&plan)?;
        debug!(table = %plan.root_table, rows = rows.len(), "plan fetched");
        RowAssembler::new(self.schema).assemble(&plan, &rows)
    }

    /// Compile without executing, for callers that render plans
    /// themselves.
    pub fn plan(&self, request: &QueryRequest, context: &AccessContext) -> Result<QueryPlan> {
        QueryCompiler::new(self.schema).compile(request, context)
    }
}
