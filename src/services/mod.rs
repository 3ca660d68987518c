pub mod auth_service;
pub mod checkout_service;
pub mod keyed_locks;
pub mod retention;
pub mod subscription_bridge;
pub mod transaction_processor;
