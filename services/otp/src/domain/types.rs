use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use otpgate_core::serde::to_rfc3339;

use crate::error::OtpError;

/// Longest token either generator will produce.
pub const MAX_TOKEN_LEN: usize = 64;

/// Default validity window applied when none is configured, in minutes.
pub const DEFAULT_VALIDITY_MINUTES: u32 = 5;

/// Alphabet used to generate a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpKind {
    /// Decimal digits `0-9`.
    Numeric,
    /// Lowercase hexadecimal `0-9a-f`.
    Alphanumeric,
}

impl OtpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Alphanumeric => "alphanumeric",
        }
    }
}

impl fmt::Display for OtpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OtpKind {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "numeric" => Ok(Self::Numeric),
            "alphanumeric" => Ok(Self::Alphanumeric),
            other => Err(OtpError::UnsupportedKind(other.to_owned())),
        }
    }
}

/// A single issued passcode. Immutable once stored; reissuing replaces it.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpRecord {
    pub identifier: String,
    pub token: String,
    pub kind: OtpKind,
    pub expires_at: DateTime<Utc>,
}

impl OtpRecord {
    /// Expiry is inclusive: at `expires_at` the record is already dead.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Constant-time comparison against a caller-supplied token.
    pub fn token_matches(&self, candidate: &str) -> bool {
        self.token.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

// Keeps the secret out of logs and panic messages.
impl fmt::Debug for OtpRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtpRecord")
            .field("identifier", &self.identifier)
            .field("token", &"<redacted>")
            .field("kind", &self.kind)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Outcome of a validation attempt. Only `Valid` consumes the record;
/// `Expired` also removes it, `Mismatch` leaves it in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Valid,
    NotFound,
    Expired,
    Mismatch,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Stable reason code exposed to callers.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::NotFound => "not_found",
            Self::Expired => "expired",
            Self::Mismatch => "mismatch",
        }
    }

    /// Whether reaching this outcome removes the record from the store.
    pub(crate) fn removes_record(&self) -> bool {
        matches!(self, Self::Valid | Self::Expired)
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Which records a sweep may touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepScope {
    /// Scan the whole store.
    All,
    /// Only the record stored under this identifier, and only if expired.
    Identifier(String),
}

impl From<Option<String>> for SweepScope {
    fn from(identifier: Option<String>) -> Self {
        match identifier {
            Some(id) if !id.is_empty() => Self::Identifier(id),
            _ => Self::All,
        }
    }
}

/// Issuance notification handed to the notifier. The serialized fields are
/// consumed by downstream delivery workers; `id` travels beside the payload.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedEvent {
    #[serde(skip)]
    pub id: Uuid,
    pub identifier: String,
    pub token: String,
    pub kind: OtpKind,
    #[serde(serialize_with = "to_rfc3339")]
    pub expires_at: DateTime<Utc>,
}

impl From<&OtpRecord> for IssuedEvent {
    fn from(record: &OtpRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            identifier: record.identifier.clone(),
            token: record.token.clone(),
            kind: record.kind,
            expires_at: record.expires_at,
        }
    }
}
