use super::*;
use crate::net::testing::{client_for, dead_backend, spawn_backend};
use axum::Json;
use axum::Router;
use axum::http::HeaderMap as AxumHeaderMap;
use axum::routing::get;
use serde_json::json;

fn header_echo(headers: &AxumHeaderMap) -> Value {
    let get = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned);
    json!({
        "authorization": get("authorization"),
        "content_type": get("content-type"),
        "x_trace": get("x-trace"),
    })
}

async fn echo_backend() -> String {
    let router = Router::new()
        .route(
            "/echo",
            get(|h: AxumHeaderMap| async move { Json(header_echo(&h)) }).post(
                |h: AxumHeaderMap, body: String| async move {
                    let mut v = header_echo(&h);
                    v["body"] = Value::String(body);
                    Json(v)
                },
            ),
        )
        .route(
            "/forbidden",
            get(|| async { (axum::http::StatusCode::FORBIDDEN, Json(json!({"detail": "Forbidden"}))) }),
        )
        .route("/empty", get(|| async { axum::http::StatusCode::NO_CONTENT }))
        .route("/plain", get(|| async { "hello trips" }))
        .route(
            "/plain-error",
            get(|| async { (axum::http::StatusCode::BAD_GATEWAY, "upstream exploded") }),
        )
        .route("/bare-error", get(|| async { axum::http::StatusCode::INTERNAL_SERVER_ERROR }))
        .route(
            "/json-error-no-detail",
            get(|| async { (axum::http::StatusCode::BAD_REQUEST, Json(json!({"title": ["required"]}))) }),
        );
    spawn_backend(router).await
}

// =============================================================================
// fetch_with_auth
// =============================================================================

#[tokio::test]
async fn forbidden_detail_becomes_api_error_message() {
    let base = echo_backend().await;
    let client = client_for(&base);

    let err = client
        .fetch_with_auth("/forbidden", &StaticToken(Some("tok".into())), RequestOptions::get())
        .await
        .unwrap_err();

    assert_eq!(err, ApiError::Status { status: 403, message: "Forbidden".into() });
}

#[tokio::test]
async fn no_content_resolves_to_empty() {
    let base = echo_backend().await;
    let client = client_for(&base);

    let body = client
        .fetch_with_auth("/empty", &StaticToken(Some("tok".into())), RequestOptions::get())
        .await
        .unwrap();

    assert!(body.is_empty());
    assert_eq!(body.into_value(), Value::Null);
}

#[tokio::test]
async fn bearer_header_attached_when_token_present() {
    let base = echo_backend().await;
    let client = client_for(&base);

    let body = client
        .fetch_with_auth("/echo", &StaticToken(Some("abc123".into())), RequestOptions::get())
        .await
        .unwrap()
        .into_value();

    assert_eq!(body["authorization"], "Bearer abc123");
    assert_eq!(body["content_type"], Value::Null);
}

#[tokio::test]
async fn missing_token_still_sends_request_unauthenticated() {
    let base = echo_backend().await;
    let client = client_for(&base);

    let body = client
        .fetch_with_auth("/echo", &StaticToken(None), RequestOptions::get())
        .await
        .unwrap()
        .into_value();

    assert_eq!(body["authorization"], Value::Null);
}

#[tokio::test]
async fn json_content_type_set_when_body_supplied() {
    let base = echo_backend().await;
    let client = client_for(&base);

    let body = client
        .fetch_with_auth("/echo", &StaticToken(Some("t".into())), RequestOptions::post(json!({"title": "Run"})))
        .await
        .unwrap()
        .into_value();

    assert_eq!(body["content_type"], "application/json");
    assert_eq!(body["authorization"], "Bearer t");
    let sent: Value = serde_json::from_str(body["body"].as_str().unwrap()).unwrap();
    assert_eq!(sent, json!({"title": "Run"}));
}

#[tokio::test]
async fn caller_headers_merge_and_override_defaults() {
    let base = echo_backend().await;
    let client = client_for(&base);

    let options = RequestOptions::post(json!({}))
        .header(CONTENT_TYPE, HeaderValue::from_static("application/vnd.trip+json"))
        .header(HeaderName::from_static("x-trace"), HeaderValue::from_static("t-1"));
    let body = client
        .fetch_with_auth("/echo", &StaticToken(Some("t".into())), options)
        .await
        .unwrap()
        .into_value();

    assert_eq!(body["content_type"], "application/vnd.trip+json");
    assert_eq!(body["x_trace"], "t-1");
    assert_eq!(body["authorization"], "Bearer t");
}

#[tokio::test]
async fn caller_authorization_wins_when_explicit() {
    let base = echo_backend().await;
    let client = client_for(&base);

    let options = RequestOptions::get().header(AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
    let body = client
        .fetch_with_auth("/echo", &StaticToken(Some("t".into())), options)
        .await
        .unwrap()
        .into_value();

    assert_eq!(body["authorization"], "Basic Zm9v");
}

#[tokio::test]
async fn non_json_success_returned_as_text() {
    let base = echo_backend().await;
    let client = client_for(&base);

    let body = client.fetch_api("/plain", RequestOptions::get()).await.unwrap();
    assert_eq!(body, ResponseBody::Text("hello trips".into()));
}

#[tokio::test]
async fn non_json_error_uses_raw_text() {
    let base = echo_backend().await;
    let client = client_for(&base);

    let err = client.fetch_api("/plain-error", RequestOptions::get()).await.unwrap_err();
    assert_eq!(err, ApiError::Status { status: 502, message: "upstream exploded".into() });
}

#[tokio::test]
async fn empty_error_body_uses_status_message() {
    let base = echo_backend().await;
    let client = client_for(&base);

    let err = client.fetch_api("/bare-error", RequestOptions::get()).await.unwrap_err();
    assert_eq!(err.message(), "HTTP error! status: 500");
}

#[tokio::test]
async fn json_error_without_detail_uses_generic_message() {
    let base = echo_backend().await;
    let client = client_for(&base);

    let err = client.fetch_api("/json-error-no-detail", RequestOptions::get()).await.unwrap_err();
    assert_eq!(err.message(), "Request failed with status 400");
}

#[tokio::test]
async fn absolute_endpoint_bypasses_base_url() {
    let base = echo_backend().await;
    let client = client_for("http://127.0.0.1:9");

    let body = client
        .fetch_with_auth(&format!("{base}/echo"), &StaticToken(Some("abs".into())), RequestOptions::get())
        .await
        .unwrap()
        .into_value();

    assert_eq!(body["authorization"], "Bearer abs");
}

#[tokio::test]
async fn unreachable_backend_is_network_error() {
    let base = dead_backend().await;
    let client = client_for(&base);

    let err = client.fetch_api("/anything", RequestOptions::get()).await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}

#[tokio::test]
async fn token_with_newline_is_invalid_request() {
    let base = echo_backend().await;
    let client = client_for(&base);

    let err = client
        .fetch_with_auth("/echo", &StaticToken(Some("bad\ntoken".into())), RequestOptions::get())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest(_)));
}

// =============================================================================
// pure helpers
// =============================================================================

#[test]
fn resolve_joins_relative_and_keeps_absolute() {
    let client = client_for("https://api.example.test/");
    assert_eq!(client.resolve("/api/tracking/list"), "https://api.example.test/api/tracking/list");
    assert_eq!(client.resolve("https://other.test/x"), "https://other.test/x");
}

#[test]
fn error_message_prefers_detail() {
    assert_eq!(error_message(401, r#"{"detail":"Token expired"}"#), "Token expired");
    assert_eq!(error_message(400, r#"{"detail":""}"#), "Request failed with status 400");
    assert_eq!(error_message(400, r#"{"detail":["a","b"]}"#), r#"["a","b"]"#);
    assert_eq!(error_message(503, "   "), "HTTP error! status: 503");
}

#[test]
fn response_body_json_decodes_text_and_json() {
    let parsed: Vec<u32> = ResponseBody::Text("[1,2]".into()).json().unwrap();
    assert_eq!(parsed, vec![1, 2]);
    let parsed: Option<u32> = ResponseBody::Empty.json().unwrap();
    assert_eq!(parsed, None);
    assert!(ResponseBody::Json(json!("x")).json::<u32>().is_err());
}
