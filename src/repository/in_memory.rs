use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{check_transition, RepositoryError, RepositoryResult, TransactionRepository};
use crate::models::transaction::{StateChange, Transaction, TransactionState};

/// Process-local store. Every mutation happens under the write half of one
/// `RwLock`, so get-or-create and compare-and-swap are atomic.
#[derive(Default)]
pub struct InMemoryTransactionRepository {
    transactions: RwLock<HashMap<String, Transaction>>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.transactions.read().await.len()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn create_if_absent(&self, tx: Transaction) -> RepositoryResult<(Transaction, bool)> {
        let mut transactions = self.transactions.write().await;
        if let Some(existing) = transactions.get(&tx.id) {
            return Ok((existing.clone(), false));
        }
        transactions.insert(tx.id.clone(), tx.clone());
        Ok((tx, true))
    }

    async fn find(&self, id: &str) -> RepositoryResult<Option<Transaction>> {
        Ok(self.transactions.read().await.get(id).cloned())
    }

    async fn transition(
        &self,
        id: &str,
        expected: TransactionState,
        change: StateChange,
    ) -> RepositoryResult<Transaction> {
        check_transition(expected, &change)?;

        let mut transactions = self.transactions.write().await;
        let tx = transactions
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        if tx.state != expected {
            return Err(RepositoryError::StateConflict {
                id: id.to_string(),
                expected,
                current: tx.state,
            });
        }

        change.apply(tx);
        Ok(tx.clone())
    }

    async fn list_created_between(&self, from: i64, to: i64) -> RepositoryResult<Vec<Transaction>> {
        let transactions = self.transactions.read().await;
        let mut found: Vec<Transaction> = transactions
            .values()
            .filter(|tx| tx.create_time >= from && tx.create_time <= to)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.create_time.cmp(&b.create_time).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn purge_created_before(&self, cutoff: i64) -> RepositoryResult<u64> {
        let mut transactions = self.transactions.write().await;
        let before = transactions.len();
        transactions.retain(|_, tx| tx.create_time >= cutoff);
        Ok((before - transactions.len()) as u64)
    }
}
