//! Optional jittered exponential backoff between dispatch attempts.

use std::time::Duration;

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Default base delay when backoff is enabled without overrides.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(100);
/// Default ceiling for a single backoff delay.
pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(5);

const MIN_SLEEP_MS: u64 = 10;

/// Exponential backoff policy applied between retries.
///
/// A zero `base` or `cap` does not disable the delay: each retry still sleeps
/// 10 ms. To retry without delay, leave the policy unset instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: DEFAULT_BACKOFF_BASE,
            cap: DEFAULT_BACKOFF_CAP,
        }
    }
}

/// Per-delivery backoff state. Created fresh for every `deliver` call.
pub(crate) struct BackoffState {
    policy: BackoffPolicy,
    current: Duration,
    rng: StdRng,
}

impl BackoffState {
    pub(crate) fn new(policy: BackoffPolicy) -> Self {
        Self {
            current: policy.base,
            rng: StdRng::from_entropy(),
            policy,
        }
    }

    /// Jittered delay before the next attempt. The upper bound doubles after
    /// every call until it reaches the cap.
    pub(crate) fn next_sleep(&mut self) -> Duration {
        let max_ms = self.current.min(self.policy.cap).as_millis().min(u128::from(u64::MAX)) as u64;
        self.current = self.current.saturating_mul(2).min(self.policy.cap);
        let sleep_ms = match max_ms {
            0 => MIN_SLEEP_MS,
            1..=MIN_SLEEP_MS => max_ms,
            _ => self.rng.gen_range(MIN_SLEEP_MS..=max_ms),
        };
        Duration::from_millis(sleep_ms)
    }
}
