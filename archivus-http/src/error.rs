//! Maps `ArchivusError` onto the HTTP JSON error shape and status code
//! (§6.1, §7): `{ "error", "message", "details"?, "code"? }`, with the
//! internal source chain dropped before anything reaches the wire.

use archivus_core::ArchivusError;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

pub struct ApiError(pub ArchivusError);

impl From<ArchivusError> for ApiError {
    fn from(err: ArchivusError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ArchivusError::invalid_input(rejection.body_text()))
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self(ArchivusError::invalid_input(err.to_string()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let safe = self.0.sanitize_for_client();
        let status = StatusCode::from_u16(safe.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(safe.to_json())).into_response()
    }
}
