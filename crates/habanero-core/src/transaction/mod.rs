//! Transactional units and the committer that orders and applies them.

mod committer;
mod unit;

pub use committer::{CommitSummary, TransactionCommitter};
pub use unit::{Phase, PlannedOp, TransactionalUnit};
