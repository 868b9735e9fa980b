use std::sync::Arc;

use crate::manager::OtpManager;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<OtpManager>,
}

impl AppState {
    pub fn new(manager: Arc<OtpManager>) -> Self {
        Self { manager }
    }
}
