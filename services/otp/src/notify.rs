//! Fire-and-forget delivery of issuance events.
//!
//! Events go into a bounded queue with a non-blocking enqueue. A detached
//! worker drains the queue into a [`Notifier`]. Publish failures are logged
//! and counted, never reported back to the issuer and never retried.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::ports::Notifier;
use crate::domain::types::IssuedEvent;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicU64,
    published: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time view of dispatcher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Accepted into the queue.
    pub queued: u64,
    /// Delivered by the notifier.
    pub published: u64,
    /// Rejected by the notifier.
    pub failed: u64,
    /// Never queued: queue full, worker gone, or dispatcher closed.
    pub dropped: u64,
}

pub struct NotificationDispatcher {
    sender: Mutex<Option<mpsc::Sender<IssuedEvent>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl NotificationDispatcher {
    /// Start a worker task draining into `notifier`. Must be called inside a tokio runtime.
    pub fn spawn<N: Notifier>(notifier: N, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let counters = Arc::new(Counters::default());
        let worker = tokio::spawn(run_worker(notifier, rx, Arc::clone(&counters)));
        Self {
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            counters,
        }
    }

    /// A dispatcher that accepts nothing; every event is counted as dropped.
    pub fn disabled() -> Self {
        Self {
            sender: Mutex::new(None),
            worker: Mutex::new(None),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Enqueue without waiting. Never blocks and never fails the caller.
    pub fn dispatch(&self, event: IssuedEvent) {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = sender.as_ref() else {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(identifier = %event.identifier, "notifications closed, event dropped");
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {
                self.counters.queued.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(event)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(identifier = %event.identifier, "notification queue full, event dropped");
            }
            Err(TrySendError::Closed(event)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(identifier = %event.identifier, "notification worker gone, event dropped");
            }
        }
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            queued: self.counters.queued.load(Ordering::Relaxed),
            published: self.counters.published.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting events, let the worker drain what is queued, then wait
    /// for it to close the notifier. Later calls return immediately.
    pub async fn close(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(sender);

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = worker else {
            return;
        };
        if let Err(e) = handle.await {
            warn!(error = %e, "notification worker terminated abnormally");
        }
    }
}

async fn run_worker<N: Notifier>(
    notifier: N,
    mut rx: mpsc::Receiver<IssuedEvent>,
    counters: Arc<Counters>,
) {
    while let Some(event) = rx.recv().await {
        match notifier.publish(&event).await {
            Ok(()) => {
                counters.published.fetch_add(1, Ordering::Relaxed);
                debug!(event_id = %event.id, identifier = %event.identifier, "otp notification published");
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    error = %e,
                    event_id = %event.id,
                    identifier = %event.identifier,
                    "failed to publish otp notification"
                );
            }
        }
    }
    if let Err(e) = notifier.close().await {
        warn!(error = %e, "failed to close notification transport");
    }
    info!("notification worker stopped");
}
