use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use order_invoice::{Assets, InvoiceService, Layout, MockMailer, Renderer, TotalPolicy};
use order_invoice_api::{AppState, build_router};
use serde_json::{Value, json};
use tower::util::ServiceExt;

fn app_with(mailer: Arc<MockMailer>, layout: Layout) -> Router {
    let renderer = Renderer::new(layout, Arc::new(Assets::none()), "http://localhost:4444").unwrap();
    build_router(AppState::new(InvoiceService::new(
        renderer,
        mailer,
        TotalPolicy::Warn,
    )))
}

fn order() -> Value {
    json!({
        "customer_name": "Jonas Jonaitis",
        "customer_email": "jonas@example.com",
        "phone": "+37060000000",
        "shipping_address": "Gedimino pr. 1, Vilnius",
        "delivery_method": "Omniva",
        "payment_reference": "ORD-1",
        "invoice_number": "100",
        "products": [{ "name": "Kremas", "quantity": 2, "price": 10 }],
        "total_price": 24.2
    })
}

fn post(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn preflight_is_answered_with_cors_headers() {
    let response = app_with(Arc::new(MockMailer::new()), Layout::Table)
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/send-email")
                .header(header::ORIGIN, "https://beautybyella.lt")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS]
        .to_str()
        .unwrap()
        .to_ascii_uppercase();
    assert!(methods.contains("POST"));
    assert!(methods.contains("OPTIONS"));
    let allowed = headers[header::ACCESS_CONTROL_ALLOW_HEADERS]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(allowed.contains("content-type"));
}

#[tokio::test]
async fn other_methods_are_rejected() {
    for method in [Method::GET, Method::PUT, Method::DELETE] {
        let response = app_with(Arc::new(MockMailer::new()), Layout::Table)
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri("/api/send-email")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "Only POST requests allowed" })
        );
    }
}

#[tokio::test]
async fn valid_order_is_mailed_with_pdf() {
    let mailer = Arc::new(MockMailer::new());
    let response = app_with(mailer.clone(), Layout::Table)
        .oneshot(post("/api/send-email", order().to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(
        json_body(response).await,
        json!({ "success": true, "messageId": "<mock-1@localhost>" })
    );

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "jonas@example.com");
    assert!(sent[0].subject.contains("ORD-1"));
    let attachment = sent[0].attachment.as_ref().unwrap();
    assert_eq!(attachment.filename, "invoice-EVA100.pdf");
    assert!(attachment.bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn legacy_path_is_served() {
    let mailer = Arc::new(MockMailer::new());
    let response = app_with(mailer.clone(), Layout::InlineHtml)
        .oneshot(post("/api/send-email.js", order().to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(mailer.sent()[0].html.contains("EVA100"));
    assert!(mailer.sent()[0].attachment.is_none());
}

#[tokio::test]
async fn explicit_recipient_overrides_customer_email() {
    let mailer = Arc::new(MockMailer::new());
    let mut body = order();
    body["to"] = json!("billing@example.com");
    let response = app_with(mailer.clone(), Layout::Table)
        .oneshot(post("/api/send-email", body.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(mailer.sent()[0].to, "billing@example.com");
}

#[tokio::test]
async fn missing_recipient_is_a_bad_request() {
    let mailer = Arc::new(MockMailer::new());
    let mut body = order();
    body.as_object_mut().unwrap().remove("customer_email");
    let response = app_with(mailer.clone(), Layout::Table)
        .oneshot(post("/api/send-email", body.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "Missing recipient email (to)" })
    );
    assert_eq!(mailer.send_count(), 0);
}

#[tokio::test]
async fn missing_payment_reference_is_a_bad_request() {
    let mailer = Arc::new(MockMailer::new());
    let mut body = order();
    body["payment_reference"] = json!("");
    let response = app_with(mailer.clone(), Layout::Table)
        .oneshot(post("/api/send-email", body.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "Missing required fields: payment_reference" })
    );
    assert_eq!(mailer.send_count(), 0);
}

#[tokio::test]
async fn no_valid_products_is_a_bad_request() {
    let mailer = Arc::new(MockMailer::new());
    let mut body = order();
    body["products"] = json!([
        { "name": "Kremas", "quantity": 0, "price": 10 },
        { "name": "", "quantity": 1, "price": 10 },
        { "name": "Serumas", "quantity": 1, "price": "free" }
    ]);
    let response = app_with(mailer.clone(), Layout::Table)
        .oneshot(post("/api/send-email", body.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({ "error": "No valid products" }));
    assert_eq!(mailer.send_count(), 0);
}

#[tokio::test]
async fn huge_exponent_total_is_ignored() {
    let mailer = Arc::new(MockMailer::new());
    let mut body = order();
    body["total_price"] = json!("1e400000000");
    let response = tokio::time::timeout(
        Duration::from_secs(10),
        app_with(mailer.clone(), Layout::SimpleText)
            .oneshot(post("/api/send-email", body.to_string())),
    )
    .await
    .expect("request finished in time")
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(mailer.send_count(), 1);
}

#[tokio::test]
async fn huge_exponent_price_drops_the_product() {
    let mailer = Arc::new(MockMailer::new());
    let mut body = order();
    body["products"] = json!([{ "name": "Kremas", "quantity": 1, "price": "1e400000000" }]);
    let response = tokio::time::timeout(
        Duration::from_secs(10),
        app_with(mailer.clone(), Layout::Table)
            .oneshot(post("/api/send-email", body.to_string())),
    )
    .await
    .expect("request finished in time")
    .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({ "error": "No valid products" }));
    assert_eq!(mailer.send_count(), 0);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let mailer = Arc::new(MockMailer::new());
    let response = app_with(mailer.clone(), Layout::Table)
        .oneshot(post("/api/send-email", String::from("{not json")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
    assert_eq!(mailer.send_count(), 0);
}

#[tokio::test]
async fn transport_failure_is_a_server_error() {
    let mailer = Arc::new(MockMailer::failing("connection refused"));
    let response = app_with(mailer, Layout::Table)
        .oneshot(post("/api/send-email", order().to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert!(body.get("success").is_none());
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("connection refused")
    );
}

#[tokio::test]
async fn health_reports_ok() {
    let response = app_with(Arc::new(MockMailer::new()), Layout::SimpleText)
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["layout"], "simple-text");
}
