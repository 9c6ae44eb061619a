use crate::dispatch::DispatchError;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    /// No `image` field in the request.
    MissingInput,
    /// The upload did not decode; carries the decoder message.
    InvalidImage(String),
    /// The multipart body itself could not be read.
    Multipart(MultipartError),
    Dispatch(DispatchError),
    StoreUnreachable(String),
    Internal(String),
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        ApiError::Dispatch(err)
    }
}

impl ApiError {
    fn dispatch_body(err: &DispatchError) -> (StatusCode, serde_json::Value) {
        match err {
            DispatchError::AuthFailure { model, details } => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "error": "Authentication with the generative service failed. Check the configured API key.",
                    "details": details,
                    "model": model,
                }),
            ),
            DispatchError::ServiceUnavailable { model, details } => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({
                    "error": "The generative service is temporarily unavailable. Please try again later.",
                    "details": details,
                    "model": model,
                }),
            ),
            DispatchError::Exhausted {
                failures,
                available_models,
            } => {
                let attempted = err.attempted_models();
                let (status, message) = if err.all_shape_rejected() {
                    (
                        StatusCode::BAD_REQUEST,
                        "Every candidate model rejected the request format.",
                    )
                } else {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Failed to analyze image with any available model.",
                    )
                };
                let mut body = json!({
                    "error": message,
                    "details": format!("Tried models: {}", attempted.join(", ")),
                    "attempted_models": attempted,
                    "failures": failures,
                });
                if let Some(models) = available_models {
                    body["available_models"] = json!(models);
                }
                (status, body)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::MissingInput => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "No image file provided" }),
            ),
            ApiError::InvalidImage(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": format!("Invalid image file: {}", msg) }),
            ),
            ApiError::Multipart(err) => (err.status(), json!({ "error": err.body_text() })),
            ApiError::Dispatch(err) => Self::dispatch_body(&err),
            ApiError::StoreUnreachable(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Usage store connection failed", "details": details }),
            ),
            ApiError::Internal(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Internal server error", "details": details }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
