use axum::{extract::State, http::StatusCode};

use otpgate_core::error::AppError;

use crate::state::AppState;

/// Handler for `GET /readyz`: not ready once the manager has been closed.
pub async fn readyz(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    if state.manager.is_closed() {
        return Err(AppError::Unavailable);
    }
    Ok(StatusCode::OK)
}
