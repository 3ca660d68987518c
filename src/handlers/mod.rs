pub(crate) mod checkout_handlers;
pub(crate) mod health;
pub(crate) mod payment_rpc;
