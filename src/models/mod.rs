pub mod receipt;
pub mod rpc;
pub mod tier;
pub mod transaction;
pub mod user;
