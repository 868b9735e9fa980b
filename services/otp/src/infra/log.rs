use tracing::info;

use crate::domain::ports::{Notifier, NotifyError};
use crate::domain::types::IssuedEvent;

/// Fallback notifier used when no broker is configured. Records issuance in
/// the service log without the token itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn publish(&self, event: &IssuedEvent) -> Result<(), NotifyError> {
        info!(
            event_id = %event.id,
            identifier = %event.identifier,
            kind = %event.kind,
            expires_at = %event.expires_at,
            "otp issued (no broker configured)"
        );
        Ok(())
    }

    async fn close(&self) -> Result<(), NotifyError> {
        Ok(())
    }
}
