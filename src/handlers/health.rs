// handlers/health.rs
use axum::{extract::State, response::Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::database::connection::ping;
use crate::state::AppState;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn payment_health(State(state): State<AppState>) -> Json<Value> {
    let database = match &state.db {
        Some(db) => {
            if ping(db).await {
                "connected"
            } else {
                "disconnected"
            }
        }
        None => "not configured",
    };

    Json(json!({
        "status": "ok",
        "service": "payments",
        "database": database,
        "methods": [
            "CheckPerformTransaction",
            "CreateTransaction",
            "PerformTransaction",
            "CancelTransaction",
            "CheckTransaction",
            "GetStatement",
            "ChangePassword",
        ],
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::app_state;

    #[tokio::test]
    async fn reports_missing_database() {
        let Json(body) = payment_health(State(app_state())).await;
        assert_eq!(body["database"], "not configured");
        assert_eq!(body["methods"].as_array().unwrap().len(), 7);
    }
}
