use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use atelier_core::AtelierError;

/// Error type for HTTP handlers, rendered as a JSON `{error}` body
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Pipeline failure
    #[error(transparent)]
    Pipeline(#[from] AtelierError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) | ApiError::Pipeline(AtelierError::ValidationError(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Pipeline(err) => {
                tracing::error!(error = %err, "Pipeline error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
