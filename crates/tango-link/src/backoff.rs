//! Reconnect delays: full-jitter exponential backoff.

use std::time::Duration;

/// Grows a delay ceiling on every failed attempt and samples the actual
/// delay uniformly below it, so restarting clients spread out instead
/// of retrying in lockstep.
#[derive(Debug)]
pub struct Backoff {
    ceiling_ms: u64,
    base_ms: u64,
    cap_ms: u64,
}

impl Backoff {
    /// A backoff starting at `base_ms` and never exceeding `cap_ms`.
    #[must_use]
    pub fn new(base_ms: u64, cap_ms: u64) -> Self {
        Self {
            ceiling_ms: base_ms,
            base_ms,
            cap_ms,
        }
    }

    /// Sample the delay before the next attempt and double the ceiling.
    pub fn next_delay(&mut self) -> Duration {
        let bound = self.ceiling_ms.min(self.cap_ms);
        let jittered = if bound == 0 { 0 } else { fastrand::u64(..=bound) };
        self.ceiling_ms = bound.saturating_mul(2);
        Duration::from_millis(jittered)
    }

    /// Drop back to the base ceiling after a successful connection.
    pub fn reset(&mut self) {
        self.ceiling_ms = self.base_ms;
    }
}
