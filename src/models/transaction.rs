// models/transaction.rs
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// JSON key of the single account field the network sends in `params.account`.
pub const ACCOUNT_FIELD: &str = "Login";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum TransactionState {
    Created,
    Completed,
    CancelledAfterCreate,
    CancelledAfterComplete,
}

impl TransactionState {
    pub fn code(self) -> i32 {
        match self {
            TransactionState::Created => 1,
            TransactionState::Completed => 2,
            TransactionState::CancelledAfterCreate => -1,
            TransactionState::CancelledAfterComplete => -2,
        }
    }

    pub fn is_cancelled(self) -> bool {
        self.code() < 0
    }

    /// Legal moves: CREATED -> COMPLETED, CREATED -> -1, COMPLETED -> -2.
    pub fn can_transition_to(self, next: TransactionState) -> bool {
        matches!(
            (self, next),
            (TransactionState::Created, TransactionState::Completed)
                | (TransactionState::Created, TransactionState::CancelledAfterCreate)
                | (TransactionState::Completed, TransactionState::CancelledAfterComplete)
        )
    }
}

impl From<TransactionState> for i32 {
    fn from(state: TransactionState) -> Self {
        state.code()
    }
}

impl TryFrom<i32> for TransactionState {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(TransactionState::Created),
            2 => Ok(TransactionState::Completed),
            -1 => Ok(TransactionState::CancelledAfterCreate),
            -2 => Ok(TransactionState::CancelledAfterComplete),
            other => Err(format!("unknown transaction state {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum CancelReason {
    ReceiverNotFound,
    ProcessingError,
    ExecutionFailed,
    Timeout,
    Refund,
}

impl CancelReason {
    pub fn code(self) -> i32 {
        match self {
            CancelReason::ReceiverNotFound => 1,
            CancelReason::ProcessingError => 2,
            CancelReason::ExecutionFailed => 3,
            CancelReason::Timeout => 4,
            CancelReason::Refund => 5,
        }
    }
}

impl From<CancelReason> for i32 {
    fn from(reason: CancelReason) -> Self {
        reason.code()
    }
}

impl TryFrom<i32> for CancelReason {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(CancelReason::ReceiverNotFound),
            2 => Ok(CancelReason::ProcessingError),
            3 => Ok(CancelReason::ExecutionFailed),
            4 => Ok(CancelReason::Timeout),
            5 => Ok(CancelReason::Refund),
            other => Err(format!("unknown cancel reason {}", other)),
        }
    }
}

/// End-user reference. Opaque to the payment core; the subscription bridge resolves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "Login")]
    pub login: String,
}

impl Account {
    pub fn new(login: impl Into<String>) -> Self {
        Account { login: login.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "_id")]
    pub id: String,
    /// Creation time as reported by the network.
    pub time: i64,
    pub amount: i64,
    pub account: Account,
    pub state: TransactionState,
    pub create_time: i64,
    pub perform_time: i64,
    pub cancel_time: i64,
    pub reason: Option<CancelReason>,
    #[serde(default)]
    pub receivers: Option<Value>,
}

impl Transaction {
    pub fn new(
        id: String,
        time: i64,
        amount: i64,
        account: Account,
        receivers: Option<Value>,
        now: i64,
    ) -> Self {
        Transaction {
            id,
            time,
            amount,
            account,
            state: TransactionState::Created,
            create_time: now,
            perform_time: 0,
            cancel_time: 0,
            reason: None,
            receivers,
        }
    }

    pub fn create_result(&self) -> Value {
        json!({
            "create_time": self.create_time,
            "transaction": self.id,
            "state": self.state.code(),
            "receivers": self.receivers,
        })
    }

    pub fn perform_result(&self) -> Value {
        json!({
            "transaction": self.id,
            "perform_time": self.perform_time,
            "state": self.state.code(),
        })
    }

    pub fn cancel_result(&self) -> Value {
        json!({
            "transaction": self.id,
            "cancel_time": self.cancel_time,
            "state": self.state.code(),
        })
    }

    pub fn check_result(&self) -> Value {
        json!({
            "create_time": self.create_time,
            "perform_time": self.perform_time,
            "cancel_time": self.cancel_time,
            "transaction": self.id,
            "state": self.state.code(),
            "reason": self.reason.map(CancelReason::code),
        })
    }

    pub fn statement_entry(&self) -> Value {
        json!({
            "id": self.id,
            "time": self.time,
            "amount": self.amount,
            "account": self.account,
            "create_time": self.create_time,
            "perform_time": self.perform_time,
            "cancel_time": self.cancel_time,
            "transaction": self.id,
            "state": self.state.code(),
            "reason": self.reason.map(CancelReason::code),
            "receivers": self.receivers,
        })
    }
}

/// Field updates applied together with a compare-and-swap on `state`.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub state: TransactionState,
    pub perform_time: Option<i64>,
    pub cancel_time: Option<i64>,
    pub reason: Option<CancelReason>,
}

impl StateChange {
    pub fn complete(now: i64) -> Self {
        StateChange {
            state: TransactionState::Completed,
            perform_time: Some(now),
            cancel_time: None,
            reason: None,
        }
    }

    pub fn cancel_created(reason: CancelReason, now: i64) -> Self {
        StateChange {
            state: TransactionState::CancelledAfterCreate,
            perform_time: Some(0),
            cancel_time: Some(now),
            reason: Some(reason),
        }
    }

    pub fn cancel_completed(now: i64) -> Self {
        StateChange {
            state: TransactionState::CancelledAfterComplete,
            perform_time: None,
            cancel_time: Some(now),
            reason: Some(CancelReason::Refund),
        }
    }

    pub fn apply(&self, tx: &mut Transaction) {
        tx.state = self.state;
        if let Some(perform_time) = self.perform_time {
            tx.perform_time = perform_time;
        }
        if let Some(cancel_time) = self.cancel_time {
            tx.cancel_time = cancel_time;
        }
        if self.reason.is_some() {
            tx.reason = self.reason;
        }
    }
}
