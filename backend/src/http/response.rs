use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::CatalogError;

/// Every response body is `{"data": ..., "error": ...}` with exactly one of
/// the two set.
#[derive(Serialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
    pub error: Option<String>,
}

pub fn ok<T: Serialize>(data: T) -> Response {
    (
        StatusCode::OK,
        Json(Envelope {
            data: Some(data),
            error: None,
        }),
    )
        .into_response()
}

pub fn fail(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(Envelope::<()> {
            data: None,
            error: Some(message.into()),
        }),
    )
        .into_response()
}

pub fn bad_request(message: impl Into<String>) -> Response {
    fail(StatusCode::BAD_REQUEST, message)
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status = match &self {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            CatalogError::Database(e) => {
                tracing::error!(error = %e, "catalog query failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::CONFLICT,
        };
        fail(status, self.to_string())
    }
}
