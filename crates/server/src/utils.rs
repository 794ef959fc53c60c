use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use library::CatalogError;
use tracing::error;

use crate::state::ErrorResponse;

pub fn json_error(
    status: StatusCode,
    message: impl Into<String>,
) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub fn json_error_response(status: StatusCode, message: impl Into<String>) -> Response {
    json_error(status, message).into_response()
}

pub fn catalog_error(err: CatalogError) -> (StatusCode, Json<ErrorResponse>) {
    error!("Catalog error: {}", err);
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("catalog error: {}", err),
    )
}

pub fn not_found(what: &str) -> (StatusCode, Json<ErrorResponse>) {
    json_error(StatusCode::NOT_FOUND, format!("{} not found", what))
}
