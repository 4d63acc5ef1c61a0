// src/scheduler/backoff.rs
use std::time::Duration;

/// Exponential delay for throttled sources.
///
/// Without strikes the delay is the normal interval. Each consecutive
/// rate-limit doubles it, capped at `max`; any successful fetch resets it.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    strikes: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            strikes: 0,
        }
    }

    pub fn strikes(&self) -> u32 {
        self.strikes
    }

    pub fn current(&self) -> Duration {
        if self.strikes == 0 {
            return self.base;
        }
        let factor = 1u32.checked_shl(self.strikes.min(31)).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Register a throttled cycle and return the delay before the next one.
    /// `Retry-After` can lengthen the delay, never past `max`.
    pub fn on_rate_limit(&mut self, retry_after: Option<Duration>) -> Duration {
        self.strikes = self.strikes.saturating_add(1);
        let delay = self.current();
        match retry_after {
            Some(ra) if ra > delay => ra.min(self.max),
            _ => delay,
        }
    }

    pub fn on_success(&mut self) {
        self.strikes = 0;
    }
}
