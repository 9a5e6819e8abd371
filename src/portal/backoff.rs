//! Retry backoff (§4.3, §5). Grounded on the teacher crate's
//! `supervisor::backoff` exponential/jitter policy, generalized from a
//! restart-delay calculator to the portal's per-attempt retry wait.

use std::time::Duration;

use rand::Rng;

/// Default budget: total wall-clock time spent waiting across all retries
/// for one logical call (§2 "Actor-runner" budget table, §5).
pub const DEFAULT_BUDGET: Duration = Duration::from_secs(5);
const FACTOR: u32 = 4;
const BASE_DELAY_MS: u64 = 50;
const JITTER_RATIO: f64 = 0.5;

/// Computes the wait before each retry attempt and tracks the remaining
/// budget. Not `Clone`: each in-flight call owns one.
pub struct ExponentialBackoff {
    budget: Duration,
    spent: Duration,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_BUDGET)
    }
}

impl ExponentialBackoff {
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            spent: Duration::ZERO,
        }
    }

    /// Returns the wait duration for `attempt` (0-based), or `None` if the
    /// budget is already exhausted.
    pub fn next_delay(&mut self, attempt: u32) -> Option<Duration> {
        if self.spent >= self.budget {
            return None;
        }
        let base_ms = BASE_DELAY_MS.saturating_mul(FACTOR.pow(attempt.min(10)) as u64);
        let jitter = rand::thread_rng().gen_range(-JITTER_RATIO..=JITTER_RATIO);
        let jittered_ms = (base_ms as f64 * (1.0 + jitter)).max(0.0) as u64;
        let delay = Duration::from_millis(jittered_ms).min(self.budget - self.spent);
        self.spent += delay;
        Some(delay)
    }
}
