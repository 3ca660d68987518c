// handlers/payment_rpc.rs
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method},
    Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::models::rpc::{ErrorCode, RpcError, RpcMethod, RpcResponse};
use crate::state::AppState;

/// JSON-RPC entry point for the payment network. Every outcome, including
/// malformed input, is a 200 with a JSON-RPC body.
pub async fn handle_rpc(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<RpcResponse> {
    let request: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            warn!("Unparsable RPC body: {}", e);
            return Json(RpcResponse::failure(Value::Null, RpcError::new(ErrorCode::ParseError)));
        }
    };

    let Some(envelope) = request.as_object() else {
        return Json(RpcResponse::failure(Value::Null, RpcError::new(ErrorCode::InvalidRequest)));
    };

    let id = envelope.get("id").cloned().unwrap_or(Value::Null);

    let Some(method_name) = envelope.get("method").and_then(Value::as_str) else {
        return Json(RpcResponse::failure(id, RpcError::new(ErrorCode::MethodNotFound)));
    };

    if id.is_null() {
        return Json(RpcResponse::failure(id, RpcError::invalid_params("missing id")));
    }

    let credential = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if !state.auth.authorize(credential) {
        return Json(RpcResponse::failure(
            id,
            RpcError::new(ErrorCode::InvalidAuthorization),
        ));
    }

    let Some(method) = RpcMethod::parse(method_name) else {
        warn!("Unknown RPC method {}", method_name);
        return Json(RpcResponse::failure(
            id,
            RpcError::new(ErrorCode::MethodNotFound).with_data(method_name),
        ));
    };

    let params = envelope.get("params").unwrap_or(&Value::Null);
    let outcome = state.processor.handle(method, params).await;

    match &outcome {
        Ok(_) => info!("{} handled (id {})", method.as_str(), id),
        Err(e) => info!("{} failed with {} (id {})", method.as_str(), e.code, id),
    }

    Json(RpcResponse::from_result(id, outcome))
}

pub async fn reject_non_post(method: Method) -> Json<RpcResponse> {
    warn!("RPC endpoint called with {}", method);
    Json(RpcResponse::failure(
        Value::Null,
        RpcError::new(ErrorCode::InvalidHttpMethod),
    ))
}

/// Public error taxonomy for integrators.
pub async fn list_error_codes() -> Json<Value> {
    let codes: Vec<Value> = ErrorCode::ALL
        .iter()
        .map(|code| json!({ "code": code.code(), "message": code.message() }))
        .collect();
    Json(json!({ "success": true, "error_codes": codes }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use base64::{engine::general_purpose::STANDARD as base64, Engine as _};
    use tower::ServiceExt;

    use super::*;
    use crate::routes::payments::payment_routes;
    use crate::state::testing::{app_state, AUTH_LOGIN, AUTH_SECRET};

    fn app() -> Router {
        payment_routes().with_state(app_state())
    }

    fn auth_header() -> String {
        format!("Basic {}", base64.encode(format!("{}:{}", AUTH_LOGIN, AUTH_SECRET)))
    }

    async fn send(app: &Router, auth: Option<&str>, body: impl Into<Body>) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json");
        if let Some(auth) = auth {
            request = request.header("authorization", auth);
        }

        let response = app
            .clone()
            .oneshot(request.body(body.into()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn rpc(app: &Router, method: &str, params: Value, id: Value) -> Value {
        let body = json!({ "jsonrpc": "2.0", "method": method, "params": params, "id": id });
        let (status, value) = send(app, Some(&auth_header()), body.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        value
    }

    #[tokio::test]
    async fn invalid_json_is_parse_error() {
        let (status, body) = send(&app(), Some(&auth_header()), "{not json").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"]["code"], -32700);
        assert!(body["id"].is_null());
    }

    #[tokio::test]
    async fn non_object_is_invalid_request() {
        let (_, body) = send(&app(), Some(&auth_header()), "[1,2]").await;
        assert_eq!(body["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn missing_method_echoes_id() {
        let (_, body) = send(&app(), Some(&auth_header()), json!({ "id": 9 }).to_string()).await;
        assert_eq!(body["error"]["code"], -32601);
        assert_eq!(body["id"], 9);
    }

    #[tokio::test]
    async fn missing_id_is_invalid_params() {
        let body = json!({ "method": "CheckTransaction", "params": { "id": "T1" } });
        let (_, body) = send(&app(), Some(&auth_header()), body.to_string()).await;
        assert_eq!(body["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn unknown_method_names_itself() {
        let body = rpc(&app(), "RefundEverything", json!({}), json!(3)).await;
        assert_eq!(body["error"]["code"], -32601);
        assert_eq!(body["error"]["data"], "RefundEverything");
        assert_eq!(body["id"], 3);
    }

    #[tokio::test]
    async fn authorization_runs_before_business_logic() {
        let app = app();
        let body = json!({
            "method": "CreateTransaction",
            "params": {
                "id": "T1",
                "time": 1_700_000_000_000i64,
                "amount": 25_000_000,
                "account": { "Login": "userA" },
            },
            "id": 11,
        })
        .to_string();

        let wrong = format!("Basic {}", base64.encode("Paycom:wrong"));
        for auth in [None, Some("Bearer token"), Some(wrong.as_str())] {
            let (status, response) = send(&app, auth, body.clone()).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(response["error"]["code"], -32504);
            assert_eq!(response["id"], 11);
        }

        let check = rpc(&app, "CheckTransaction", json!({ "id": "T1" }), json!(12)).await;
        assert_eq!(check["error"]["code"], -31003);
    }

    #[tokio::test]
    async fn payment_lifecycle_over_http() {
        let app = app();
        let created = rpc(
            &app,
            "CreateTransaction",
            json!({
                "id": "T1",
                "time": 1_700_000_000_000i64,
                "amount": 25_000_000,
                "account": { "Login": "userA" },
            }),
            json!(1),
        )
        .await;
        assert_eq!(created["jsonrpc"], "2.0");
        assert_eq!(created["result"]["state"], 1);

        let performed = rpc(&app, "PerformTransaction", json!({ "id": "T1" }), json!(2)).await;
        assert_eq!(performed["result"]["state"], 2);

        let cancelled = rpc(&app, "CancelTransaction", json!({ "id": "T1", "reason": 5 }), json!(3)).await;
        assert_eq!(cancelled["result"]["state"], -2);

        let status = rpc(&app, "CheckTransaction", json!({ "id": "T1" }), json!(4)).await;
        assert_eq!(status["result"]["reason"], 5);
    }

    #[tokio::test]
    async fn business_errors_stay_http_200() {
        let body = rpc(
            &app(),
            "CheckPerformTransaction",
            json!({ "amount": 99_999_999, "account": { "Login": "userA" } }),
            json!("abc"),
        )
        .await;
        assert_eq!(body["error"]["code"], -31001);
        assert_eq!(body["error"]["message"]["en"], "Invalid amount");
        assert_eq!(body["id"], "abc");
    }

    #[tokio::test]
    async fn get_is_rejected_with_protocol_error() {
        let response = app()
            .oneshot(Request::builder().method("GET").uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], -32300);
    }

    #[tokio::test]
    async fn change_password_takes_effect_for_next_call() {
        let app = app();
        let changed = rpc(&app, "ChangePassword", json!({ "password": "n3w" }), json!(1)).await;
        assert_eq!(changed["result"]["success"], true);

        let body = json!({ "method": "CheckTransaction", "params": { "id": "T1" }, "id": 2 }).to_string();
        let (_, stale) = send(&app, Some(&auth_header()), body.clone()).await;
        assert_eq!(stale["error"]["code"], -32504);

        let fresh = format!("Basic {}", base64.encode("Paycom:n3w"));
        let (_, ok) = send(&app, Some(&fresh), body).await;
        assert_eq!(ok["error"]["code"], -31003);
    }

    #[tokio::test]
    async fn error_codes_are_listed() {
        let Json(body) = list_error_codes().await;
        let codes = body["error_codes"].as_array().unwrap();
        assert_eq!(codes.len(), ErrorCode::ALL.len());
        assert!(codes.iter().any(|c| c["code"] == -31630));
    }
}
