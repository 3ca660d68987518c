use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    error::{ErrorKind, WriteFailure},
    options::ReturnDocument,
    Collection, Database, IndexModel,
};

use super::{check_transition, RepositoryError, RepositoryResult, TransactionRepository};
use crate::models::transaction::{StateChange, Transaction, TransactionState};

pub const TRANSACTIONS_COLLECTION: &str = "payment_transactions";

const DUPLICATE_KEY: i32 = 11000;

impl From<mongodb::error::Error> for RepositoryError {
    fn from(err: mongodb::error::Error) -> Self {
        RepositoryError::Storage(err.to_string())
    }
}

/// Document-store repository. The network's transaction id is the `_id`, so
/// the unique index on `_id` makes create-if-absent atomic across instances.
#[derive(Clone)]
pub struct MongoTransactionRepository {
    collection: Collection<Transaction>,
}

impl MongoTransactionRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(TRANSACTIONS_COLLECTION),
        }
    }

    pub async fn ensure_indexes(&self) -> RepositoryResult<()> {
        let index = IndexModel::builder().keys(doc! { "create_time": 1 }).build();
        self.collection.create_index(index).await?;
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

fn change_to_update(change: &StateChange) -> Document {
    let mut set = doc! { "state": change.state.code() };
    if let Some(perform_time) = change.perform_time {
        set.insert("perform_time", perform_time);
    }
    if let Some(cancel_time) = change.cancel_time {
        set.insert("cancel_time", cancel_time);
    }
    if let Some(reason) = change.reason {
        set.insert("reason", reason.code());
    }
    doc! { "$set": set }
}

#[async_trait]
impl TransactionRepository for MongoTransactionRepository {
    async fn create_if_absent(&self, tx: Transaction) -> RepositoryResult<(Transaction, bool)> {
        match self.collection.insert_one(&tx).await {
            Ok(_) => Ok((tx, true)),
            Err(err) if is_duplicate_key(&err) => {
                let existing = self
                    .collection
                    .find_one(doc! { "_id": &tx.id })
                    .await?
                    .ok_or_else(|| RepositoryError::NotFound(tx.id.clone()))?;
                Ok((existing, false))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find(&self, id: &str) -> RepositoryResult<Option<Transaction>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn transition(
        &self,
        id: &str,
        expected: TransactionState,
        change: StateChange,
    ) -> RepositoryResult<Transaction> {
        check_transition(expected, &change)?;

        let filter = doc! { "_id": id, "state": expected.code() };
        let updated = self
            .collection
            .find_one_and_update(filter, change_to_update(&change))
            .return_document(ReturnDocument::After)
            .await?;

        if let Some(tx) = updated {
            return Ok(tx);
        }

        match self.find(id).await? {
            Some(current) => Err(RepositoryError::StateConflict {
                id: id.to_string(),
                expected,
                current: current.state,
            }),
            None => Err(RepositoryError::NotFound(id.to_string())),
        }
    }

    async fn list_created_between(&self, from: i64, to: i64) -> RepositoryResult<Vec<Transaction>> {
        let filter = doc! { "create_time": { "$gte": from, "$lte": to } };
        let cursor = self
            .collection
            .find(filter)
            .sort(doc! { "create_time": 1, "_id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn purge_created_before(&self, cutoff: i64) -> RepositoryResult<u64> {
        let result = self
            .collection
            .delete_many(doc! { "create_time": { "$lt": cutoff } })
            .await?;
        Ok(result.deleted_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transaction::CancelReason;

    #[test]
    fn complete_sets_state_and_perform_time_only() {
        let update = change_to_update(&StateChange::complete(500));
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_i32("state").unwrap(), 2);
        assert_eq!(set.get_i64("perform_time").unwrap(), 500);
        assert!(!set.contains_key("cancel_time"));
        assert!(!set.contains_key("reason"));
    }

    #[test]
    fn cancel_created_resets_perform_time() {
        let update = change_to_update(&StateChange::cancel_created(CancelReason::ExecutionFailed, 900));
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_i32("state").unwrap(), -1);
        assert_eq!(set.get_i64("perform_time").unwrap(), 0);
        assert_eq!(set.get_i64("cancel_time").unwrap(), 900);
        assert_eq!(set.get_i32("reason").unwrap(), 3);
    }

    #[test]
    fn refund_records_reason_five() {
        let update = change_to_update(&StateChange::cancel_completed(900));
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_i32("state").unwrap(), -2);
        assert_eq!(set.get_i32("reason").unwrap(), 5);
        assert!(!set.contains_key("perform_time"));
    }
}
