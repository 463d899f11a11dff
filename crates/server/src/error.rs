use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jukebox_core::error::{ApiError, ErrorEnvelope};
use jukebox_index::IndexError;

/// Newtype wrapper so we can implement `IntoResponse` in this crate.
pub struct AppError(pub ApiError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let envelope = ErrorEnvelope::from(&self.0);
        (status, Json(envelope)).into_response()
    }
}

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        Self(e)
    }
}

impl From<IndexError> for AppError {
    fn from(e: IndexError) -> Self {
        Self(ApiError::Internal(format!("index build failed: {e}")))
    }
}
