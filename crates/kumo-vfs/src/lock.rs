//! Per-file lock records.

use std::time::{Duration, Instant};

use rand::RngCore;

/// Token bytes; rendered as twice as many hex characters.
const TOKEN_BYTES: usize = 16;

/// A held lock: opaque token plus absolute expiry.
#[derive(Debug, Clone)]
pub struct LockHolder {
    token: String,
    expires: Option<Instant>,
}

impl LockHolder {
    /// Acquire a fresh lock. A zero `timeout` never expires.
    pub fn acquire(timeout: Duration) -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let expires = if timeout.is_zero() {
            None
        } else {
            // Overflowing timeouts behave like "never".
            Instant::now().checked_add(timeout)
        };
        Self {
            token: hex::encode(bytes),
            expires,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires(&self) -> Option<Instant> {
        self.expires
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires.is_some_and(|deadline| now >= deadline)
    }

    /// Exact token comparison; `None` never matches.
    pub fn matches(&self, token: Option<&str>) -> bool {
        token == Some(self.token.as_str())
    }
}
