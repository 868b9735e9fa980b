use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use otpgate_core::error::error_response;

use crate::domain::ports::EntropyError;
use crate::domain::types::MAX_TOKEN_LEN;

/// Failures of the issuance path. Validation outcomes are not errors; see
/// [`crate::domain::types::Validation`].
#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("invalid token length {length}: must be between 1 and {max}", max = MAX_TOKEN_LEN)]
    InvalidLength { length: i64 },
    #[error("unsupported otp kind: {0}")]
    UnsupportedKind(String),
    #[error("random source unavailable: {0}")]
    RandomSource(String),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl OtpError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidLength { .. } => "INVALID_LENGTH",
            Self::UnsupportedKind(_) => "UNSUPPORTED_KIND",
            Self::RandomSource(_) => "RANDOM_SOURCE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub(crate) fn invalid_length(length: usize) -> Self {
        Self::InvalidLength {
            length: i64::try_from(length).unwrap_or(i64::MAX),
        }
    }
}

impl From<EntropyError> for OtpError {
    fn from(err: EntropyError) -> Self {
        Self::RandomSource(err.0)
    }
}

impl IntoResponse for OtpError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidLength { .. } | Self::UnsupportedKind(_) => StatusCode::BAD_REQUEST,
            Self::RandomSource(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // 4xx are caller mistakes; only server-side failures are logged here.
        match &self {
            Self::RandomSource(msg) => {
                tracing::error!(error = %msg, kind = "RANDOM_SOURCE", "entropy source failure");
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, kind = "INTERNAL", "internal error");
            }
            _ => {}
        }
        error_response(status, self.kind(), self.to_string())
    }
}
