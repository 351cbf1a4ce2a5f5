//! Continuous-refill token bucket.
//!
//! On each decision the elapsed time since the last refill is converted to
//! tokens and added to the bucket (capped at capacity), then one token is
//! consumed if available. The caller supplies `now`, which keeps the bucket
//! a pure state machine and lets tests drive time explicitly.

use std::time::Duration;
use tokio::time::Instant;

/// Per-client token bucket.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    /// Maximum tokens the bucket can hold
    capacity: f64,
    /// Tokens added per second
    refill_per_second: f64,
    /// Current token count, always within `0.0..=capacity`
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    ///
    /// - `capacity`: burst size, the number of back-to-back requests allowed.
    /// - `refill_per_second`: sustained rate.
    pub fn new(capacity: u32, refill_per_second: f64, now: Instant) -> Self {
        let capacity = f64::from(capacity);
        Self {
            capacity,
            refill_per_second,
            tokens: capacity,
            last_refill: now,
        }
    }

    /// Refill for the time elapsed up to `now`, then try to take one token.
    ///
    /// Returns `true` if the token was consumed (request admitted).
    pub fn allow(&mut self, now: Instant) -> bool {
        self.refill(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Token count after refilling up to `now`. Does not consume.
    pub fn available(&mut self, now: Instant) -> f64 {
        self.refill(now);
        self.tokens
    }

    /// Time until at least one whole token is available.
    ///
    /// Saturates at [`Duration::MAX`] when the rate is too small for the
    /// wait to be representable.
    pub fn retry_after(&mut self, now: Instant) -> Duration {
        self.refill(now);
        let missing = 1.0 - self.tokens;
        if missing <= 0.0 || self.refill_per_second <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(missing / self.refill_per_second).unwrap_or(Duration::MAX)
    }

    pub fn capacity(&self) -> u32 {
        self.capacity as u32
    }

    pub fn refill_per_second(&self) -> f64 {
        self.refill_per_second
    }

    // A `now` at or before `last_refill` (clock regression, or concurrent
    // callers sampling time out of order) adds nothing and keeps
    // `last_refill` where it is.
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        if elapsed.is_zero() {
            return;
        }
        let refill = elapsed.as_secs_f64() * self.refill_per_second;
        self.tokens = (self.tokens + refill).min(self.capacity);
        self.last_refill = now;
    }
}
