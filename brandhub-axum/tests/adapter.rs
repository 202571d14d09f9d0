use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderValue, Method, Request};
use brandhub_axum::{AxumApp, Dispatch};
use brandhub_core::{ApiResponse, HubError, InboundRequest};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

struct Echo;

#[async_trait]
impl Dispatch for Echo {
    async fn dispatch(&self, endpoint: &'static str, req: InboundRequest) -> ApiResponse {
        match endpoint {
            "echo" => ApiResponse::ok(
                "echo",
                json!({
                    "brand": req.header("x-brand-name"),
                    "token": req.bearer_token(),
                    "id": req.path_param("id"),
                    "page": req.query_param("page"),
                    "body": req.body,
                    "request_id": req.request_id,
                }),
            ),
            _ => ApiResponse::from_error(&HubError::forbidden("Access denied")),
        }
    }
}

fn app() -> axum::Router {
    AxumApp::new(Arc::new(Echo))
        .endpoint(Method::POST, "/echo/{id}", "echo")
        .endpoint(Method::GET, "/denied", "denied")
        .service("/health", || async { "ok" })
        .into_router()
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn inbound_request_carries_headers_params_query_and_body() {
    let res = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/echo/7?page=2")
                .header("X-Brand-Name", "BrandA")
                .header("Authorization", "Bearer tok")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"saved_search":"bikes"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    assert!(res.headers().get("x-request-id").is_some());
    let body = json_body(res).await;
    assert_eq!(body["status"], "success");
    let data = &body["data"];
    assert_eq!(data["brand"], "BrandA");
    assert_eq!(data["token"], "tok");
    assert_eq!(data["id"], "7");
    assert_eq!(data["page"], "2");
    assert_eq!(data["body"]["saved_search"], "bikes");
    assert!(data["request_id"].is_string());
}

#[tokio::test]
async fn request_id_is_preserved_when_provided() {
    let provided = HeaderValue::from_static("req-test-123");
    let res = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/echo/1")
                .header("x-request-id", provided.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.headers().get("x-request-id").unwrap(), &provided);
    let body = json_body(res).await;
    assert_eq!(body["data"]["request_id"], "req-test-123");
    assert_eq!(body["data"]["body"], Value::Null);
}

#[tokio::test]
async fn malformed_json_is_a_structured_bad_request() {
    let res = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/echo/1")
                .header("content-type", "application/json")
                .body(Body::from("{\"title\":\"x\""))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 400);
    let body = json_body(res).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"]["name"], "BadRequest");
    assert_eq!(body["error"]["className"], "bad-request");
    assert!(body["error"].get("errors").is_some());
}

#[tokio::test]
async fn error_envelopes_use_the_error_code_as_status() {
    let res = app()
        .oneshot(Request::builder().uri("/denied").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 403);
    let body = json_body(res).await;
    assert_eq!(body["message"], "Access denied");
}

#[tokio::test]
async fn plain_services_bypass_the_dispatcher() {
    let res = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ok");
}
