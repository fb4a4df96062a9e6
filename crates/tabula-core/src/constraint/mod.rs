//! Write-time constraint enforcement and transactions.

mod enforcer;
mod transaction;

pub use enforcer::ConstraintEnforcer;
pub use transaction::{TransactionState, WriteTransaction};
