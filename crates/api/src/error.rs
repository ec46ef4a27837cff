//! JSON error responses.
//!
//! Every failure leaves the API as `{"error": CODE, "message": text}` with the
//! status of its `AppError` class. Infrastructure failures are logged and
//! answered with a generic message.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use ardesk_shared::DomainError;

/// Builds the response for a domain error.
pub fn error_response<E: DomainError>(err: &E) -> Response {
    let app_error = err.classify();
    let status =
        StatusCode::from_u16(app_error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if app_error.is_internal() {
        error!(error = %err, code = err.error_code(), "Request failed");
        return (
            status,
            Json(json!({
                "error": "INTERNAL_ERROR",
                "message": "An error occurred"
            })),
        )
            .into_response();
    }

    (
        status,
        Json(json!({
            "error": err.error_code(),
            "message": err.to_string(),
        })),
    )
        .into_response()
}

/// 400 for a request whose shape could not be read.
pub fn validation_response(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "VALIDATION_ERROR",
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Malformed or missing JSON body.
pub fn json_rejection(rejection: &JsonRejection) -> Response {
    validation_response(rejection.body_text())
}

/// Unparseable query string.
pub fn query_rejection(rejection: &QueryRejection) -> Response {
    validation_response(rejection.body_text())
}

/// Path segment that is not a valid id.
pub fn path_rejection(rejection: &PathRejection) -> Response {
    validation_response(rejection.body_text())
}
