//! HTTP error mapping: every failure is `{ "error": { "code", "message" } }`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use meridian_runtime::RuntimeError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing or empty X-User-Id header")]
    Unauthenticated,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            ApiError::Runtime(err) => match err {
                RuntimeError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
                RuntimeError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                RuntimeError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}
