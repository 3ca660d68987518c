// services/transaction_processor.rs
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};

use crate::models::receipt::ReceiptItem;
use crate::models::rpc::{ErrorCode, RpcError, RpcMethod};
use crate::models::tier::{Tier, TierTable};
use crate::models::transaction::{
    Account, CancelReason, StateChange, Transaction, TransactionState, ACCOUNT_FIELD,
};
use crate::repository::{RepositoryError, TransactionRepository};
use crate::services::auth_service::MerchantAuth;
use crate::services::keyed_locks::KeyedLocks;
use crate::services::subscription_bridge::{AccountStatus, BridgeError, SubscriptionBridge};

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub tiers: TierTable,
    pub bridge_timeout: Duration,
    /// Unperformed transactions older than this are cancelled on Perform. Zero disables.
    pub transaction_timeout_ms: i64,
    pub receipt: ReceiptItem,
}

type RpcResult = Result<Value, RpcError>;

pub struct TransactionProcessor {
    config: ProcessorConfig,
    repository: Arc<dyn TransactionRepository>,
    bridge: Arc<dyn SubscriptionBridge>,
    auth: Arc<MerchantAuth>,
    locks: KeyedLocks,
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn require<'a>(params: &'a Map<String, Value>, field: &str) -> Result<&'a Value, RpcError> {
    match params.get(field) {
        Some(value) if !value.is_null() => Ok(value),
        _ => Err(RpcError::invalid_params(format!("missing {}", field))),
    }
}

fn require_str<'a>(params: &'a Map<String, Value>, field: &str) -> Result<&'a str, RpcError> {
    require(params, field)?
        .as_str()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| RpcError::invalid_params(format!("{} must be a non-empty string", field)))
}

fn require_i64(params: &Map<String, Value>, field: &str) -> Result<i64, RpcError> {
    require(params, field)?
        .as_i64()
        .ok_or_else(|| RpcError::invalid_params(format!("{} must be an integer", field)))
}

fn account_error(code: ErrorCode) -> RpcError {
    RpcError::new(code).with_data(ACCOUNT_FIELD)
}

impl TransactionProcessor {
    pub fn new(
        config: ProcessorConfig,
        repository: Arc<dyn TransactionRepository>,
        bridge: Arc<dyn SubscriptionBridge>,
        auth: Arc<MerchantAuth>,
    ) -> Self {
        TransactionProcessor {
            config,
            repository,
            bridge,
            auth,
            locks: KeyedLocks::new(),
        }
    }

    pub async fn handle(&self, method: RpcMethod, params: &Value) -> RpcResult {
        let empty = Map::new();
        let params = params.as_object().unwrap_or(&empty);

        match method {
            RpcMethod::CheckPerformTransaction => self.check_perform_transaction(params).await,
            RpcMethod::CreateTransaction => self.create_transaction(params).await,
            RpcMethod::PerformTransaction => self.perform_transaction(params).await,
            RpcMethod::CancelTransaction => self.cancel_transaction(params).await,
            RpcMethod::CheckTransaction => self.check_transaction(params).await,
            RpcMethod::GetStatement => self.get_statement(params).await,
            RpcMethod::ChangePassword => self.change_password(params),
        }
    }

    fn validate_amount(&self, amount: &Value) -> Result<Tier, RpcError> {
        amount
            .as_i64()
            .and_then(|amount| self.config.tiers.find(amount))
            .ok_or_else(|| {
                warn!("Rejected amount {}", amount);
                RpcError::new(ErrorCode::InvalidAmount)
            })
    }

    async fn validate_account(&self, account: &Value) -> Result<Account, RpcError> {
        let account: Account = serde_json::from_value(account.clone())
            .ok()
            .filter(|account: &Account| !account.login.trim().is_empty())
            .ok_or_else(|| account_error(ErrorCode::InvalidAccount))?;

        let lookup = tokio::time::timeout(
            self.config.bridge_timeout,
            self.bridge.resolve_account(&account),
        )
        .await
        .unwrap_or(Err(BridgeError::Timeout))
        .map_err(|e| {
            error!("Account lookup for {} failed: {}", account.login, e);
            RpcError::new(ErrorCode::InternalError)
        })?;

        if !lookup.exists {
            warn!("Account {} not found", account.login);
            return Err(account_error(ErrorCode::InvalidAccount));
        }

        match lookup.status {
            AccountStatus::WaitingPayment => Ok(account),
            AccountStatus::Blocked => Err(account_error(ErrorCode::AccountBlocked)),
            AccountStatus::Processing => Err(account_error(ErrorCode::AccountProcessing)),
        }
    }

    async fn find_existing(&self, id: &str) -> Result<Transaction, RpcError> {
        self.repository
            .find(id)
            .await?
            .ok_or_else(|| RpcError::new(ErrorCode::TransactionNotFound))
    }

    pub async fn check_perform_transaction(&self, params: &Map<String, Value>) -> RpcResult {
        let amount = require(params, "amount")?;
        let account = require(params, "account")?;

        let tier = self.validate_amount(amount)?;
        self.validate_account(account).await?;

        Ok(json!({
            "allow": true,
            "detail": self.config.receipt.detail(&tier),
        }))
    }

    pub async fn create_transaction(&self, params: &Map<String, Value>) -> RpcResult {
        let id = require_str(params, "id")?;
        let time = require_i64(params, "time")?;
        let amount = require(params, "amount")?;
        let account = require(params, "account")?;

        if let Some(existing) = self.repository.find(id).await? {
            info!("CreateTransaction retry for {}", id);
            return Ok(existing.create_result());
        }

        let tier = self.validate_amount(amount)?;
        let account = self.validate_account(account).await?;
        let receivers = params.get("receivers").filter(|r| !r.is_null()).cloned();

        let tx = Transaction::new(id.to_string(), time, tier.amount, account, receivers, now_ms());
        let (stored, created) = self.repository.create_if_absent(tx).await?;
        if created {
            info!("Created transaction {} for {} ({})", stored.id, stored.account.login, stored.amount);
        }

        Ok(stored.create_result())
    }

    pub async fn perform_transaction(&self, params: &Map<String, Value>) -> RpcResult {
        let id = require_str(params, "id")?;
        let _guard = self.locks.acquire(id).await;

        let tx = self.find_existing(id).await?;
        match tx.state {
            TransactionState::Completed => return Ok(tx.perform_result()),
            TransactionState::Created => {}
            _ => {
                warn!("PerformTransaction on cancelled transaction {}", id);
                return Err(RpcError::new(ErrorCode::UnableToPerform));
            }
        }

        let now = now_ms();
        if self.config.transaction_timeout_ms > 0
            && now - tx.create_time > self.config.transaction_timeout_ms
        {
            self.repository
                .transition(id, TransactionState::Created, StateChange::cancel_created(CancelReason::Timeout, now))
                .await?;
            warn!("Transaction {} expired before perform", id);
            return Err(RpcError::new(ErrorCode::UnableToPerform));
        }

        let tier = self.config.tiers.find(tx.amount).ok_or_else(|| {
            error!("Transaction {} has amount {} outside the tier table", id, tx.amount);
            RpcError::new(ErrorCode::InternalError)
        })?;

        let granted = tokio::time::timeout(
            self.config.bridge_timeout,
            self.bridge.grant_entitlement(id, &tx.account, &tier),
        )
        .await
        .unwrap_or(Err(BridgeError::Timeout));

        if let Err(e) = granted {
            error!("Entitlement grant for {} failed, leaving it CREATED: {}", id, e);
            return Err(RpcError::new(ErrorCode::InternalError));
        }

        match self
            .repository
            .transition(id, TransactionState::Created, StateChange::complete(now_ms()))
            .await
        {
            Ok(done) => {
                info!("Performed transaction {} ({} days for {})", id, tier.days, done.account.login);
                Ok(done.perform_result())
            }
            Err(RepositoryError::StateConflict {
                current: TransactionState::Completed,
                ..
            }) => Ok(self.find_existing(id).await?.perform_result()),
            Err(RepositoryError::StateConflict { .. }) => {
                Err(RpcError::new(ErrorCode::UnableToPerform))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn cancel_transaction(&self, params: &Map<String, Value>) -> RpcResult {
        let id = require_str(params, "id")?;
        if let Some(reason) = params.get("reason").and_then(Value::as_i64) {
            info!("CancelTransaction {} requested with reason {}", id, reason);
        }

        let _guard = self.locks.acquire(id).await;
        let tx = self.find_existing(id).await?;

        if tx.state.is_cancelled() {
            return Ok(tx.cancel_result());
        }

        let now = now_ms();
        let change = match tx.state {
            TransactionState::Created => StateChange::cancel_created(CancelReason::ExecutionFailed, now),
            TransactionState::Completed => StateChange::cancel_completed(now),
            _ => return Err(RpcError::new(ErrorCode::UnableToPerform)),
        };

        match self.repository.transition(id, tx.state, change).await {
            Ok(cancelled) => {
                info!("Cancelled transaction {} (state {})", id, cancelled.state.code());
                Ok(cancelled.cancel_result())
            }
            Err(RepositoryError::StateConflict { current, .. }) if current.is_cancelled() => {
                Ok(self.find_existing(id).await?.cancel_result())
            }
            Err(RepositoryError::StateConflict { .. }) => {
                Err(RpcError::new(ErrorCode::UnableToPerform))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn check_transaction(&self, params: &Map<String, Value>) -> RpcResult {
        let id = require_str(params, "id")?;
        Ok(self.find_existing(id).await?.check_result())
    }

    pub async fn get_statement(&self, params: &Map<String, Value>) -> RpcResult {
        let from = require_i64(params, "from")?;
        let to = require_i64(params, "to")?;

        let transactions: Vec<Value> = self
            .repository
            .list_created_between(from, to)
            .await?
            .iter()
            .map(Transaction::statement_entry)
            .collect();

        Ok(json!({ "transactions": transactions }))
    }

    pub fn change_password(&self, params: &Map<String, Value>) -> RpcResult {
        let password = require_str(params, "password")?;
        self.auth
            .rotate_secret(password)
            .map_err(|_| RpcError::invalid_params("password must not be blank"))?;
        Ok(json!({ "success": true }))
    }
}
