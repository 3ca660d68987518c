// services/subscription_bridge.rs
use async_trait::async_trait;
use mongodb::{
    bson::{doc, Document},
    options::ReturnDocument,
    Collection, Database,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::tier::Tier;
use crate::models::transaction::Account;
use crate::models::user::{User, USERS_COLLECTION};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    WaitingPayment,
    Processing,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountLookup {
    pub exists: bool,
    pub status: AccountStatus,
}

impl AccountLookup {
    pub fn missing() -> Self {
        AccountLookup {
            exists: false,
            status: AccountStatus::Blocked,
        }
    }

    pub fn found(status: AccountStatus) -> Self {
        AccountLookup { exists: true, status }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("account {0} not found")]
    AccountNotFound(String),

    #[error("subscription service timed out")]
    Timeout,

    #[error("subscription service unavailable: {0}")]
    Unavailable(String),
}

impl From<mongodb::error::Error> for BridgeError {
    fn from(err: mongodb::error::Error) -> Self {
        BridgeError::Unavailable(err.to_string())
    }
}

/// Boundary to the entitlement system. Both calls report failure through
/// `Result` so the state machine can translate it into a protocol error.
#[async_trait]
pub trait SubscriptionBridge: Send + Sync {
    async fn resolve_account(&self, account: &Account) -> Result<AccountLookup, BridgeError>;

    async fn grant_entitlement(
        &self,
        transaction_id: &str,
        account: &Account,
        tier: &Tier,
    ) -> Result<(), BridgeError>;
}

/// Grants subscriptions on the platform's `users` collection.
#[derive(Clone)]
pub struct MongoSubscriptionBridge {
    users: Collection<User>,
}

impl MongoSubscriptionBridge {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection(USERS_COLLECTION),
        }
    }
}

/// Update pipeline that extends `subscription_until` by `days` from the later
/// of now and the current expiry, and records the transaction id. Evaluated by
/// the server so concurrent grants for one user stack.
pub fn grant_pipeline(transaction_id: &str, days: u32) -> Vec<Document> {
    vec![doc! {
        "$set": {
            "subscription_until": {
                "$add": [
                    { "$max": ["$subscription_until", "$$NOW"] },
                    i64::from(days) * DAY_MS,
                ]
            },
            "granted_transactions": {
                "$concatArrays": [
                    { "$ifNull": ["$granted_transactions", []] },
                    [transaction_id],
                ]
            },
        }
    }]
}

#[async_trait]
impl SubscriptionBridge for MongoSubscriptionBridge {
    async fn resolve_account(&self, account: &Account) -> Result<AccountLookup, BridgeError> {
        let user = self.users.find_one(doc! { "login": &account.login }).await?;

        Ok(match user {
            None => AccountLookup::missing(),
            Some(user) if user.blocked => AccountLookup::found(AccountStatus::Blocked),
            Some(_) => AccountLookup::found(AccountStatus::WaitingPayment),
        })
    }

    async fn grant_entitlement(
        &self,
        transaction_id: &str,
        account: &Account,
        tier: &Tier,
    ) -> Result<(), BridgeError> {
        let filter = doc! {
            "login": &account.login,
            "granted_transactions": { "$ne": transaction_id },
        };
        let updated = self
            .users
            .find_one_and_update(filter, grant_pipeline(transaction_id, tier.days))
            .return_document(ReturnDocument::After)
            .await?;

        match updated {
            Some(user) => info!(
                "Granted {} days to {} (until {})",
                tier.days,
                account.login,
                user.subscription_until
                    .and_then(|until| until.try_to_rfc3339_string().ok())
                    .unwrap_or_default()
            ),
            None => {
                self.users
                    .find_one(doc! { "login": &account.login })
                    .await?
                    .ok_or_else(|| BridgeError::AccountNotFound(account.login.clone()))?;
                warn!("Entitlement for {} already granted to {}", transaction_id, account.login);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    /// Records every grant; can be told to fail or stall.
    #[derive(Default)]
    pub struct StubBridge {
        accounts: HashMap<String, AccountStatus>,
        grants: Mutex<Vec<(String, String, u32)>>,
        fail_grants: AtomicBool,
        grant_delay: Option<Duration>,
    }

    impl StubBridge {
        pub fn with_accounts(accounts: &[(&str, AccountStatus)]) -> Self {
            StubBridge {
                accounts: accounts
                    .iter()
                    .map(|(login, status)| (login.to_string(), *status))
                    .collect(),
                ..Default::default()
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.grant_delay = Some(delay);
            self
        }

        pub fn set_failing(&self, failing: bool) {
            self.fail_grants.store(failing, Ordering::SeqCst);
        }

        pub fn grants(&self) -> Vec<(String, String, u32)> {
            self.grants.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SubscriptionBridge for StubBridge {
        async fn resolve_account(&self, account: &Account) -> Result<AccountLookup, BridgeError> {
            Ok(match self.accounts.get(&account.login) {
                Some(status) => AccountLookup::found(*status),
                None => AccountLookup::missing(),
            })
        }

        async fn grant_entitlement(
            &self,
            transaction_id: &str,
            account: &Account,
            tier: &Tier,
        ) -> Result<(), BridgeError> {
            if let Some(delay) = self.grant_delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_grants.load(Ordering::SeqCst) {
                return Err(BridgeError::Unavailable("stub failure".to_string()));
            }
            self.grants.lock().unwrap().push((
                transaction_id.to_string(),
                account.login.clone(),
                tier.days,
            ));
            Ok(())
        }
    }
}
