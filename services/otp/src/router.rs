use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use otpgate_core::health::healthz;
use otpgate_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    health::readyz,
    otp::{invalidate_otp, issue_otp, sweep_otps, validate_otp},
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // OTP
        .route("/otp", post(issue_otp))
        .route("/otp/validate", post(validate_otp))
        .route("/otp/sweep", post(sweep_otps))
        .route("/otp/{identifier}", delete(invalidate_otp))
        .with_state(state)
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
}
