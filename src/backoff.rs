/// file: src/backoff.rs
/// description: bounded exponential reconnect schedule
use crate::config::BackoffConfig;
use std::time::Duration;

/// Tracks consecutive failed or dropped connections and turns them into delays.
///
/// The delay for attempt `k` is `min(base * 2^k, cap)`. Once `max_attempts`
/// retries have been handed out, [`Backoff::next_delay`] returns `None` until
/// the schedule is reset.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    max_attempts: Option<u32>,
    jitter: f64,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: &BackoffConfig) -> Self {
        Self {
            base: config.base,
            cap: config.cap,
            max_attempts: config.max_attempts,
            jitter: config.jitter.clamp(0.0, 1.0),
            attempt: 0,
        }
    }

    /// Number of retries handed out since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_attempts
            .is_some_and(|max_attempts| self.attempt >= max_attempts)
    }

    /// Un-jittered delay for a 1-indexed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.cap)
    }

    /// Records a failure and returns how long to wait before the next attempt,
    /// or `None` when the retry budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.attempt = self.attempt.saturating_add(1);
        let delay = self.delay_for(self.attempt);

        if self.jitter > 0.0 {
            let stretched = delay.mul_f64(1.0 + fastrand::f64() * self.jitter);
            return Some(stretched.min(self.cap));
        }
        Some(delay)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
