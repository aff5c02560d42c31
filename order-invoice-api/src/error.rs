use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Only POST requests allowed")]
    MethodNotAllowed,

    #[error(transparent)]
    Invoice(#[from] order_invoice::Error),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                ApiError::MethodNotAllowed.to_string(),
            ),
            ApiError::Invoice(err) => match err.validation() {
                Some(reason) => {
                    tracing::info!(reason = %reason, "order rejected");
                    (StatusCode::BAD_REQUEST, reason.to_string())
                }
                None => {
                    let category = err.category();
                    tracing::error!(?category, error = %err, "order failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
                }
            },
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}
