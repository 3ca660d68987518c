use std::sync::Arc;

use mongodb::Database;

use crate::services::auth_service::MerchantAuth;
use crate::services::checkout_service::CheckoutService;
use crate::services::transaction_processor::TransactionProcessor;

#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<TransactionProcessor>,
    pub auth: Arc<MerchantAuth>,
    pub checkout: Arc<CheckoutService>,
    pub db: Option<Database>,
}

impl AppState {
    pub fn new(
        processor: Arc<TransactionProcessor>,
        auth: Arc<MerchantAuth>,
        checkout: Arc<CheckoutService>,
    ) -> Self {
        AppState {
            processor,
            auth,
            checkout,
            db: None,
        }
    }

    pub fn with_db(mut self, db: Database) -> Self {
        self.db = Some(db);
        self
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::repository::InMemoryTransactionRepository;
    use crate::services::checkout_service::tests::settings;
    use crate::services::transaction_processor::tests::{default_bridge, test_config};

    pub const AUTH_LOGIN: &str = "Paycom";
    pub const AUTH_SECRET: &str = "s3cret";

    /// In-memory state with a stub bridge knowing `userA`, `userB`, `blocked` and `busy`.
    pub fn app_state() -> AppState {
        let auth = Arc::new(MerchantAuth::new(AUTH_LOGIN, AUTH_SECRET));
        let processor = Arc::new(TransactionProcessor::new(
            test_config(),
            Arc::new(InMemoryTransactionRepository::new()),
            Arc::new(default_bridge()),
            auth.clone(),
        ));
        AppState::new(processor, auth, Arc::new(CheckoutService::new(settings())))
    }
}
