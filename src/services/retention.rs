// services/retention.rs
use std::time::Duration;

use tracing::info;

use crate::repository::{RepositoryResult, TransactionRepository};

/// Drops transactions whose `create_time` is older than `max_age`.
/// Invoked on a schedule owned by the caller.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    pub max_age: Duration,
}

impl RetentionPolicy {
    pub fn from_days(days: u64) -> Self {
        RetentionPolicy {
            max_age: Duration::from_secs(days.saturating_mul(24 * 60 * 60)),
        }
    }

    pub fn cutoff(&self, now_ms: i64) -> i64 {
        let max_age_ms = i64::try_from(self.max_age.as_millis()).unwrap_or(i64::MAX);
        now_ms.saturating_sub(max_age_ms)
    }

    pub async fn sweep(&self, repository: &dyn TransactionRepository, now_ms: i64) -> RepositoryResult<u64> {
        let purged = repository.purge_created_before(self.cutoff(now_ms)).await?;
        if purged > 0 {
            info!("Retention sweep removed {} transactions", purged);
        }
        Ok(purged)
    }
}
