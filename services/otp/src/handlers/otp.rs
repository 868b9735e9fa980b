use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use otpgate_core::error::AppError;
use otpgate_core::serde::to_rfc3339;

use crate::domain::types::{OtpKind, SweepScope};
use crate::error::OtpError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct IssueOtpRequest {
    pub identifier: String,
    pub kind: String,
    pub length: i64,
}

/// The token itself is only delivered through the notification channel.
#[derive(Serialize)]
pub struct IssueOtpResponse {
    pub identifier: String,
    pub kind: OtpKind,
    #[serde(serialize_with = "to_rfc3339")]
    pub expires_at: DateTime<Utc>,
}

pub async fn issue_otp(
    State(state): State<AppState>,
    Json(body): Json<IssueOtpRequest>,
) -> Result<(StatusCode, Json<IssueOtpResponse>), OtpError> {
    let kind: OtpKind = body.kind.parse()?;
    let length = usize::try_from(body.length).map_err(|_| OtpError::InvalidLength {
        length: body.length,
    })?;

    let record = state.manager.generate(&body.identifier, kind, length)?;
    Ok((
        StatusCode::CREATED,
        Json(IssueOtpResponse {
            identifier: record.identifier,
            kind: record.kind,
            expires_at: record.expires_at,
        }),
    ))
}

#[derive(Deserialize)]
pub struct ValidateOtpRequest {
    pub identifier: String,
    pub token: String,
}

#[derive(Serialize)]
pub struct ValidateOtpResponse {
    pub valid: bool,
    pub reason: &'static str,
}

pub async fn validate_otp(
    State(state): State<AppState>,
    Json(body): Json<ValidateOtpRequest>,
) -> Json<ValidateOtpResponse> {
    let outcome = state.manager.validate(&body.identifier, &body.token);
    Json(ValidateOtpResponse {
        valid: outcome.is_valid(),
        reason: outcome.reason(),
    })
}

pub async fn invalidate_otp(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.manager.invalidate(&identifier) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

#[derive(Deserialize)]
pub struct SweepParams {
    pub identifier: Option<String>,
}

#[derive(Serialize)]
pub struct SweepResponse {
    pub removed: usize,
}

pub async fn sweep_otps(
    State(state): State<AppState>,
    Query(params): Query<SweepParams>,
) -> Json<SweepResponse> {
    let removed = state.manager.sweep(SweepScope::from(params.identifier));
    Json(SweepResponse { removed })
}
