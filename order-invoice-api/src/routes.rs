use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{Method, Request, header::CONTENT_TYPE},
    response::IntoResponse,
    routing::{get, post},
};
use order_invoice::OrderRequest;
use serde::Serialize;
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{AppState, error::ApiError};

pub const SEND_EMAIL_PATH: &str = "/api/send-email";
/// Path the storefront form has always posted to
pub const SEND_EMAIL_LEGACY_PATH: &str = "/api/send-email.js";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    pub success: bool,
    pub message_id: String,
}

async fn send_email(
    State(state): State<AppState>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> Result<Json<SendEmailResponse>, ApiError> {
    let Json(order) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let receipt = state.service.process(order).await?;
    Ok(Json(SendEmailResponse {
        success: true,
        message_id: receipt.message_id,
    }))
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "layout": state.service.renderer().layout(),
    }))
}

/// Build the application router. Preflight `OPTIONS` requests are answered by the CORS layer.
pub fn build_router(state: AppState) -> Router {
    let send = post(send_email).fallback(method_not_allowed);
    Router::new()
        .route(SEND_EMAIL_PATH, send.clone())
        .route(SEND_EMAIL_LEGACY_PATH, send)
        .route("/health", get(health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::POST, Method::OPTIONS])
                .allow_headers([CONTENT_TYPE]),
        )
}
