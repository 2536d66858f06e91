//! Reconnect Backoff Policy
//!
//! Exponential backoff with jitter for session reconnection. Retries are
//! unlimited: only an explicit `stop()` ends the reconnect loop, so the
//! policy only shapes delays, it never exhausts.

use std::time::Duration;

use rand::Rng;

/// Reconnection delay policy: exponential growth, capped, with jitter.
#[derive(Debug)]
pub struct ReconnectPolicy {
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter_factor: f64,
    attempt: u32,
}

impl ReconnectPolicy {
    /// Create a policy.
    ///
    /// `multiplier` scales the delay each attempt (2.0 doubles it);
    /// `jitter_factor` randomizes each delay by ±that fraction.
    #[must_use]
    pub const fn new(
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
        jitter_factor: f64,
    ) -> Self {
        Self {
            initial_delay,
            max_delay,
            multiplier,
            jitter_factor,
            attempt: 0,
        }
    }

    /// Delay to wait before the next reconnect attempt.
    #[must_use]
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.apply_jitter(self.base_delay());
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Reset after a successful logon.
    pub const fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Number of delays handed out since the last reset.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Undithered delay for the current attempt, capped at `max_delay`.
    fn base_delay(&self) -> Duration {
        #[allow(clippy::cast_precision_loss)]
        let initial_millis = self.initial_delay.as_millis() as f64;
        let scaled = initial_millis * self.multiplier.powi(i32::try_from(self.attempt).unwrap_or(i32::MAX));

        #[allow(clippy::cast_precision_loss)]
        let max_millis = self.max_delay.as_millis() as f64;
        let capped = if scaled.is_finite() {
            scaled.min(max_millis)
        } else {
            max_millis
        };

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let capped_u64 = capped.max(0.0) as u64;
        Duration::from_millis(capped_u64)
    }

    fn apply_jitter(&self, duration: Duration) -> Duration {
        if self.jitter_factor <= 0.0 {
            return duration;
        }

        #[allow(clippy::cast_precision_loss)]
        let base_millis = duration.as_millis() as f64;
        let jitter_range = base_millis * self.jitter_factor;
        let jitter: f64 = rand::rng().random_range(-jitter_range..=jitter_range);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let adjusted_u64 = (base_millis + jitter).max(1.0) as u64;
        Duration::from_millis(adjusted_u64)
    }
}
