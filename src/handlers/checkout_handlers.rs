// handlers/checkout_handlers.rs
use axum::{
    extract::{Query, State},
    response::Html,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::Result;
use crate::services::checkout_service::{CheckoutRequest, Locale};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutQuery {
    pub amount: i64,
    pub login: String,
    #[serde(default)]
    pub lang: Locale,
}

impl From<CheckoutQuery> for CheckoutRequest {
    fn from(query: CheckoutQuery) -> Self {
        CheckoutRequest {
            amount: query.amount,
            login: query.login,
            locale: query.lang,
        }
    }
}

pub async fn checkout_link(
    State(state): State<AppState>,
    Query(query): Query<CheckoutQuery>,
) -> Result<Json<Value>> {
    let url = state.checkout.checkout_url(&query.into())?;
    Ok(Json(json!({ "success": true, "url": url })))
}

pub async fn checkout_form(
    State(state): State<AppState>,
    Query(query): Query<CheckoutQuery>,
) -> Result<Html<String>> {
    Ok(Html(state.checkout.checkout_form(&query.into())?))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::routes::payments::payment_routes;
    use crate::state::testing::app_state;

    async fn get(uri: &str) -> (StatusCode, String) {
        let response = payment_routes()
            .with_state(app_state())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn link_endpoint_returns_url() {
        let (status, body) = get("/checkout?amount=25000000&login=userA&lang=en").await;
        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(body["url"]
            .as_str()
            .unwrap()
            .starts_with("https://checkout.paycom.uz/"));
    }

    #[tokio::test]
    async fn unknown_tier_is_bad_request() {
        let (status, body) = get("/checkout?amount=1&login=userA").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("\"success\":false"));
    }

    #[tokio::test]
    async fn form_endpoint_returns_html() {
        let (status, body) = get("/checkout/form?amount=67500000&login=userB&lang=uz").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<form"));
        assert!(body.contains("name=\"account[Login]\" value=\"userB\""));
    }
}
