use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Error variants shared by every otpgate HTTP surface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,
    #[error("service unavailable")]
    Unavailable,
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Unavailable => "UNAVAILABLE",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        };
        error_response(status, self.kind(), self.to_string())
    }
}

/// Render the `{"kind", "message"}` envelope used by all error responses.
pub fn error_response(status: StatusCode, kind: &str, message: impl Into<String>) -> Response {
    let body = serde_json::json!({
        "kind": kind,
        "message": message.into(),
    });
    (status, axum::Json(body)).into_response()
}
