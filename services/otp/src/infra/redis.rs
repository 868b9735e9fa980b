use anyhow::Context as _;
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::{Pool, Runtime};

use crate::domain::ports::{Notifier, NotifyError};
use crate::domain::types::IssuedEvent;

/// Publishes issuance events to a Redis stream:
/// `XADD <topic> * event_id <uuid> identifier <identifier> payload <json>`.
#[derive(Clone)]
pub struct RedisStreamNotifier {
    pool: Pool,
    topic: String,
}

impl RedisStreamNotifier {
    /// Build the connection pool. Connections are opened lazily on first publish.
    pub fn connect(broker_url: &str, topic: impl Into<String>) -> anyhow::Result<Self> {
        let pool = deadpool_redis::Config::from_url(broker_url)
            .create_pool(Some(Runtime::Tokio1))
            .context("create redis pool for notifications")?;
        Ok(Self::from_pool(pool, topic))
    }

    pub fn from_pool(pool: Pool, topic: impl Into<String>) -> Self {
        Self {
            pool,
            topic: topic.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl Notifier for RedisStreamNotifier {
    async fn publish(&self, event: &IssuedEvent) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(event)?;
        let event_id = event.id.to_string();

        let mut conn = self
            .pool
            .get()
            .await
            .context("acquire redis connection")?;
        let _entry_id: String = conn
            .xadd(
                &self.topic,
                "*",
                &[
                    ("event_id", event_id.as_str()),
                    ("identifier", event.identifier.as_str()),
                    ("payload", payload.as_str()),
                ],
            )
            .await
            .context("xadd otp notification")?;
        Ok(())
    }

    async fn close(&self) -> Result<(), NotifyError> {
        self.pool.close();
        Ok(())
    }
}
