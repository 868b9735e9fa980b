use std::time::Duration as StdDuration;

use chrono::Duration;

use crate::domain::types::DEFAULT_VALIDITY_MINUTES;
use crate::notify::DEFAULT_QUEUE_CAPACITY;

const DEFAULT_PORT: u16 = 3120;
const DEFAULT_TOPIC: &str = "otp-issued";
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// OTP service configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpServiceConfig {
    /// Lifetime of an issued OTP in minutes (default 5). Env var: `OTP_VALIDITY_MINUTES`.
    pub validity_minutes: u32,
    /// TCP port to listen on (default 3120). Env var: `OTP_PORT`.
    pub port: u16,
    /// Redis URL of the notification broker. Unset means log-only notifications.
    /// Env var: `OTP_NOTIFY_BROKER_URL`.
    pub notify_broker_url: Option<String>,
    /// Stream the issuance events are appended to (default "otp-issued").
    /// Env var: `OTP_NOTIFY_TOPIC`.
    pub notify_topic: String,
    /// Bound of the in-process notification queue (default 1024).
    /// Env var: `OTP_NOTIFY_QUEUE_CAPACITY`.
    pub notify_queue_capacity: usize,
    /// Seconds between background sweeps; 0 disables the sweeper (default 60).
    /// Env var: `OTP_SWEEP_INTERVAL_SECS`.
    pub sweep_interval_secs: u64,
}

impl Default for OtpServiceConfig {
    fn default() -> Self {
        Self {
            validity_minutes: DEFAULT_VALIDITY_MINUTES,
            port: DEFAULT_PORT,
            notify_broker_url: None,
            notify_topic: DEFAULT_TOPIC.to_owned(),
            notify_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl OtpServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparsable or out-of-range values
    /// fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            validity_minutes: lookup("OTP_VALIDITY_MINUTES")
                .and_then(|v| v.parse().ok())
                .filter(|&m| m > 0)
                .unwrap_or(defaults.validity_minutes),
            port: lookup("OTP_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            notify_broker_url: lookup("OTP_NOTIFY_BROKER_URL").filter(|v| !v.trim().is_empty()),
            notify_topic: lookup("OTP_NOTIFY_TOPIC")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.notify_topic),
            notify_queue_capacity: lookup("OTP_NOTIFY_QUEUE_CAPACITY")
                .and_then(|v| v.parse().ok())
                .filter(|&c| c > 0)
                .unwrap_or(defaults.notify_queue_capacity),
            sweep_interval_secs: lookup("OTP_SWEEP_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sweep_interval_secs),
        }
    }

    pub fn validity(&self) -> Duration {
        Duration::minutes(i64::from(self.validity_minutes))
    }

    /// `None` when the background sweeper is disabled.
    pub fn sweep_interval(&self) -> Option<StdDuration> {
        (self.sweep_interval_secs > 0).then(|| StdDuration::from_secs(self.sweep_interval_secs))
    }
}
