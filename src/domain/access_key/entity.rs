//! Access key validity rules

use serde::{Deserialize, Serialize};

/// Default key lifetime: 24 hours
pub const DEFAULT_TTL_SECS: i64 = 86_400;

/// Outcome of validating a presented token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStatus {
    /// Stored and inside its TTL window
    Valid,
    /// Stored but past its TTL, not yet swept
    Expired,
    /// Never issued or already swept
    NotFound,
}

impl KeyStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Expired => "expired",
            Self::NotFound => "not_found",
        }
    }
}

impl std::fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Time-to-live applied to every issued key, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyTtl(i64);

impl KeyTtl {
    /// Returns `None` unless `secs` is positive
    pub fn from_secs(secs: i64) -> Option<Self> {
        (secs > 0).then_some(Self(secs))
    }

    pub fn as_secs(&self) -> i64 {
        self.0
    }

    /// Whether a key issued at `issued_at` is still valid at `now`.
    ///
    /// The window is inclusive: a key is valid while `now - issued_at <= ttl`.
    pub fn is_valid(&self, issued_at: i64, now: i64) -> bool {
        now.saturating_sub(issued_at) <= self.0
    }

    /// Status for a lookup result
    pub fn status(&self, issued_at: Option<i64>, now: i64) -> KeyStatus {
        match issued_at {
            None => KeyStatus::NotFound,
            Some(issued_at) if self.is_valid(issued_at, now) => KeyStatus::Valid,
            Some(_) => KeyStatus::Expired,
        }
    }

    /// Rows issued strictly before this timestamp are expired at `now`
    pub fn cutoff(&self, now: i64) -> i64 {
        now.saturating_sub(self.0)
    }
}

impl Default for KeyTtl {
    fn default() -> Self {
        Self(DEFAULT_TTL_SECS)
    }
}
