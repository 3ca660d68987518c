//! Transaction storage behind a trait so the state machine never touches a
//! concrete store. Both implementations guarantee atomic get-or-create and a
//! compare-and-swap on `state`.

pub mod in_memory;
pub mod mongo;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::transaction::{StateChange, Transaction, TransactionState};

pub use in_memory::InMemoryTransactionRepository;
pub use mongo::MongoTransactionRepository;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("transaction {0} not found")]
    NotFound(String),

    #[error("transaction {id} is in state {current:?}, expected {expected:?}")]
    StateConflict {
        id: String,
        expected: TransactionState,
        current: TransactionState,
    },

    #[error("illegal transition {from:?} -> {to:?}")]
    IllegalTransition {
        from: TransactionState,
        to: TransactionState,
    },

    #[error("storage failure: {0}")]
    Storage(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Inserts `tx` unless a record with the same id exists. Returns the stored
    /// record and whether this call created it.
    async fn create_if_absent(&self, tx: Transaction) -> RepositoryResult<(Transaction, bool)>;

    async fn find(&self, id: &str) -> RepositoryResult<Option<Transaction>>;

    /// Applies `change` only if the stored state still equals `expected`.
    async fn transition(
        &self,
        id: &str,
        expected: TransactionState,
        change: StateChange,
    ) -> RepositoryResult<Transaction>;

    /// Records with `from <= create_time <= to`, oldest first.
    async fn list_created_between(&self, from: i64, to: i64) -> RepositoryResult<Vec<Transaction>>;

    /// Deletes records created strictly before `cutoff`; returns how many went.
    async fn purge_created_before(&self, cutoff: i64) -> RepositoryResult<u64>;
}

pub(crate) fn check_transition(
    expected: TransactionState,
    change: &StateChange,
) -> RepositoryResult<()> {
    if expected.can_transition_to(change.state) {
        Ok(())
    } else {
        Err(RepositoryError::IllegalTransition {
            from: expected,
            to: change.state,
        })
    }
}
