//! Write transactions.
//!
//! A transaction collects validated write batches under one pinned
//! access context and applies them atomically on commit. Any failed
//! operation rolls the transaction back; a closed transaction accepts
//! nothing further, in either terminal state.

use super::enforcer::ConstraintEnforcer;
use crate::error::{Error, Result};
use crate::query::Engine;
use crate::schema::SchemaMetadata;
use crate::security::AccessContext;
use tabula_model::{Row, WriteBatch};
use tracing::{debug, warn};

/// Lifecycle of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Accepting operations.
    Open,
    /// Applied to the engine.
    Committed,
    /// Discarded; nothing was applied.
    RolledBack,
}

impl TransactionState {
    fn name(self) -> &'static str {
        match self {
            TransactionState::Open => "open",
            TransactionState::Committed => "committed",
            TransactionState::RolledBack => "rolled back",
        }
    }
}

/// A write transaction over one schema snapshot.
///
/// The snapshot and access context are pinned at begin; a concurrent
/// schema change or role change does not affect a running transaction.
pub struct WriteTransaction<'a, E: Engine> {
    schema: &'a SchemaMetadata,
    engine: &'a E,
    context: AccessContext,
    state: TransactionState,
    batch: WriteBatch,
}

impl<'a, E: Engine> WriteTransaction<'a, E> {
    /// Open a transaction acting as the given context.
    pub fn begin(schema: &'a SchemaMetadata, engine: &'a E, context: AccessContext) -> Self {
        Self {
            schema,
            engine,
            context,
            state: TransactionState::Open,
            batch: WriteBatch::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Ops collected so far.
    pub fn pending_ops(&self) -> usize {
        self.batch.len()
    }

    /// Validate and queue an insert.
    pub fn insert(&mut self, table: &str, row: &Row) -> Result<()> {
        self.run(|enforcer| enforcer.insert(table, row))
    }

    /// Validate and queue an update.
    pub fn update(&mut self, table: &str, key: &Row, changes: &Row) -> Result<()> {
        self.run(|enforcer| enforcer.update(table, key, changes))
    }

    /// Validate and queue a delete.
    pub fn delete(&mut self, table: &str, key: &Row) -> Result<()> {
        self.run(|enforcer| enforcer.delete(table, key))
    }

    fn run(
        &mut self,
        op: impl FnOnce(&ConstraintEnforcer<'_, E>) -> Result<WriteBatch>,
    ) -> Result<()> {
        self.guard()?;
        let enforcer = ConstraintEnforcer::new(self.schema, self.engine, &self.context);
        match op(&enforcer) {
            Ok(ops) => {
                self.batch.extend(ops);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "operation failed, transaction rolled back");
                self.state = TransactionState::RolledBack;
                self.batch = WriteBatch::new();
                Err(err)
            }
        }
    }

    /// Apply every queued op atomically. On engine failure nothing is
    /// applied and the transaction is rolled back.
    pub fn commit(&mut self) -> Result<()> {
        self.guard()?;
        match self.engine.apply(&self.batch) {
            Ok(()) => {
                debug!(ops = self.batch.len(), "transaction committed");
                self.state = TransactionState::Committed;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "commit failed, transaction rolled back");
                self.state = TransactionState::RolledBack;
                self.batch = WriteBatch::new();
                Err(err.into())
            }
        }
    }

    /// Discard the transaction.
    pub fn rollback(&mut self) -> Result<()> {
        self.guard()?;
        self.state = TransactionState::RolledBack;
        self.batch = WriteBatch::new();
        Ok(())
    }

    fn guard(&self) -> Result<()> {
        match self.state {
            TransactionState::Open => Ok(()),
            closed => Err(Error::TransactionClosed {
                state: closed.name(),
            }),
        }
    }
}
