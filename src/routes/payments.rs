use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{checkout_handlers, health, payment_rpc};
use crate::state::AppState;

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        // JSON-RPC endpoint called by the payment network
        .route(
            "/",
            post(payment_rpc::handle_rpc).fallback(payment_rpc::reject_non_post),
        )
        .route("/health", get(health::payment_health))
        .route("/error-codes", get(payment_rpc::list_error_codes))
        // Checkout initiation for the frontend
        .route("/checkout", get(checkout_handlers::checkout_link))
        .route("/checkout/form", get(checkout_handlers::checkout_form))
}
