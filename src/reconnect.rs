//! Reconnection policy
//!
//! Decides whether, and after how long, the connection manager should try
//! to re-open a transport the server closed. The policy is pure: it never
//! touches the transport, so it can be tested in isolation.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff with jitter and a bounded number of attempts
///
/// `max_attempts == 0` disables reconnection entirely, which is the default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Maximum consecutive attempts after a remote close (0 = never retry)
    pub max_attempts: u32,
    /// Delay before the first attempt in milliseconds
    pub base_delay_ms: u64,
    /// Upper bound for a single delay in milliseconds
    pub max_delay_ms: u64,
    /// Fraction of the delay randomized away, clamped to `0.0..=1.0`
    pub jitter: f64,
}

impl ReconnectPolicy {
    /// Never reconnect
    pub fn none() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    /// Exponential backoff without jitter
    pub fn exponential(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            max_delay_ms,
            jitter: 0.0,
        }
    }

    /// Builder-style jitter setter
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Whether any reconnection will be attempted
    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 0
    }

    /// Backoff ceiling for the given 1-based attempt, before jitter
    pub fn base_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let factor = 2u64.checked_pow(attempt - 1).unwrap_or(u64::MAX);
        let ms = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms.max(self.base_delay_ms));
        Some(Duration::from_millis(ms))
    }

    /// Delay before the given 1-based attempt, `None` once attempts are exhausted
    pub fn delay_for<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Option<Duration> {
        let ceiling = self.base_delay(attempt)?;
        let jitter = if self.jitter.is_finite() {
            self.jitter.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if jitter == 0.0 {
            return Some(ceiling);
        }
        let cut = jitter * rng.gen_range(0.0..1.0);
        Some(ceiling.mul_f64(1.0 - cut))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            jitter: 0.2,
        }
    }
}
