use std::future::Future;

use chrono::{DateTime, Utc};

use crate::domain::types::IssuedEvent;

/// Source of wall-clock time for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Cryptographically secure byte source backing token generation.
pub trait EntropySource: Send + Sync {
    /// Fill `buf` entirely or fail; a partial fill is an error.
    fn fill(&self, buf: &mut [u8]) -> Result<(), EntropyError>;
}

#[derive(Debug, thiserror::Error)]
#[error("entropy source failed: {0}")]
pub struct EntropyError(pub String);

/// Outbound transport for issuance events (message broker, log sink, ...).
pub trait Notifier: Send + Sync + 'static {
    fn publish(&self, event: &IssuedEvent)
    -> impl Future<Output = Result<(), NotifyError>> + Send;

    /// Release the transport. Called once by the dispatcher after the queue drains.
    fn close(&self) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("notification transport error: {0}")]
    Transport(#[from] anyhow::Error),
}
