use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::domain::ports::{Clock, EntropySource};
use crate::domain::types::{IssuedEvent, OtpKind, OtpRecord, SweepScope, Validation};
use crate::error::OtpError;
use crate::infra::clock::SystemClock;
use crate::infra::entropy::OsEntropy;
use crate::notify::{DispatchStats, NotificationDispatcher};
use crate::token;

/// Volatile, process-local OTP store.
///
/// One mutex covers the whole map and is held only while the map is read or
/// mutated. Token generation happens before the lock is taken and the
/// issuance event is dispatched after it is released.
pub struct OtpManager {
    store: Mutex<HashMap<String, OtpRecord>>,
    validity: Duration,
    clock: Arc<dyn Clock>,
    entropy: Arc<dyn EntropySource>,
    dispatcher: NotificationDispatcher,
    closed: AtomicBool,
}

pub struct OtpManagerBuilder {
    validity: Duration,
    dispatcher: NotificationDispatcher,
    clock: Arc<dyn Clock>,
    entropy: Arc<dyn EntropySource>,
}

impl OtpManagerBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn entropy(mut self, entropy: Arc<dyn EntropySource>) -> Self {
        self.entropy = entropy;
        self
    }

    pub fn build(self) -> OtpManager {
        OtpManager {
            store: Mutex::new(HashMap::new()),
            validity: self.validity,
            clock: self.clock,
            entropy: self.entropy,
            dispatcher: self.dispatcher,
            closed: AtomicBool::new(false),
        }
    }
}

impl OtpManager {
    /// Manager on the system clock and OS entropy.
    pub fn new(validity: Duration, dispatcher: NotificationDispatcher) -> Self {
        Self::builder(validity, dispatcher).build()
    }

    pub fn builder(validity: Duration, dispatcher: NotificationDispatcher) -> OtpManagerBuilder {
        OtpManagerBuilder {
            validity,
            dispatcher,
            clock: Arc::new(SystemClock),
            entropy: Arc::new(OsEntropy),
        }
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Issue a fresh token for `identifier`, replacing any previous one.
    ///
    /// Nothing is stored if generation fails or the expiry cannot be
    /// represented. The issuance event is queued after the store lock is
    /// released and its delivery never affects the result.
    ///
    /// Because the enqueue happens outside the lock, two concurrent calls for
    /// the same identifier may queue their events in the opposite order to
    /// their inserts. Consumers should treat the event whose `expires_at` is
    /// latest as current; sequential calls are always queued in store order.
    pub fn generate(
        &self,
        identifier: &str,
        kind: OtpKind,
        length: usize,
    ) -> Result<OtpRecord, OtpError> {
        let expires_at = self.expiry_from(self.clock.now())?;
        let token = token::generate(kind, length, self.entropy.as_ref())?;
        let record = OtpRecord {
            identifier: identifier.to_owned(),
            token,
            kind,
            expires_at,
        };

        let replaced = self
            .lock_store()
            .insert(identifier.to_owned(), record.clone())
            .is_some();

        debug!(
            identifier,
            kind = %kind,
            expires_at = %record.expires_at,
            replaced,
            "otp issued"
        );
        self.dispatcher.dispatch(IssuedEvent::from(&record));
        Ok(record)
    }

    /// Check `token` against the record for `identifier`.
    ///
    /// A match consumes the record; an expired record is removed; a mismatch
    /// leaves the record in place so the caller can retry before expiry.
    pub fn validate(&self, identifier: &str, token: &str) -> Validation {
        let now = self.clock.now();
        let outcome = {
            let mut store = self.lock_store();
            let outcome = match store.get(identifier) {
                None => Validation::NotFound,
                Some(record) if record.is_expired_at(now) => Validation::Expired,
                Some(record) if !record.token_matches(token) => Validation::Mismatch,
                Some(_) => Validation::Valid,
            };
            if outcome.removes_record() {
                store.remove(identifier);
            }
            outcome
        };

        debug!(identifier, reason = outcome.reason(), "otp validated");
        outcome
    }

    /// Remove expired records within `scope`. Returns how many were removed.
    pub fn sweep(&self, scope: SweepScope) -> usize {
        let now = self.clock.now();
        let removed = {
            let mut store = self.lock_store();
            match &scope {
                SweepScope::All => {
                    let before = store.len();
                    store.retain(|_, record| !record.is_expired_at(now));
                    before - store.len()
                }
                SweepScope::Identifier(identifier) => {
                    let expired = store
                        .get(identifier)
                        .is_some_and(|record| record.is_expired_at(now));
                    if expired {
                        store.remove(identifier);
                    }
                    usize::from(expired)
                }
            }
        };

        debug!(?scope, removed, "otp sweep finished");
        removed
    }

    /// Drop the record for `identifier` whether or not it has expired.
    pub fn invalidate(&self, identifier: &str) -> bool {
        let removed = self.lock_store().remove(identifier).is_some();
        debug!(identifier, removed, "otp invalidated");
        removed
    }

    pub fn len(&self) -> usize {
        self.lock_store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_store().is_empty()
    }

    pub fn dispatch_stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Drain pending notifications and release the transport. Issuance keeps
    /// working afterwards but no further events are sent.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.dispatcher.close().await;
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, OtpError> {
        if self.validity <= Duration::zero() {
            return Err(anyhow!("otp validity must be positive, got {}", self.validity).into());
        }
        let expires_at = now
            .checked_add_signed(self.validity)
            .ok_or_else(|| anyhow!("otp validity {} overflows the expiry timestamp", self.validity))?;
        Ok(expires_at)
    }

    // Records are never mutated in place, so a panic while the lock was held
    // cannot leave a torn entry behind.
    fn lock_store(&self) -> MutexGuard<'_, HashMap<String, OtpRecord>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
