//! Reconnection policy.
//!
//! The delay before attempt `n` (1-based) is `base_delay * 2^(n-1)`.
//! With the defaults that is 1s, 2s, 4s, 8s, 16s, after which the client
//! gives up.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use filenest_channel::ReconnectPolicy;
//!
//! let policy = ReconnectPolicy::new();
//! let delays: Vec<_> = policy.schedule().collect();
//! assert_eq!(delays.first(), Some(&Duration::from_secs(1)));
//! assert_eq!(delays.last(), Some(&Duration::from_secs(16)));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default delay before the first reconnect attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Default number of reconnect attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Exponential backoff settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before attempt 1.
    pub base_delay: Duration,

    /// Attempts allowed after a drop. `0` disables reconnection.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconnectPolicy {
    /// Creates the default policy (1000 ms base, 5 attempts).
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Creates a policy that never reconnects.
    #[inline]
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_attempts: 0,
        }
    }

    /// Sets the base delay.
    #[inline]
    #[must_use]
    pub const fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Sets the attempt limit.
    #[inline]
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Returns the delay before `attempt`, or `None` once attempts are
    /// exhausted. `attempt` is 1-based; `0` has no delay.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }

        let factor = 2u32.saturating_pow(attempt - 1);
        Some(self.base_delay.saturating_mul(factor))
    }

    /// Iterates over every delay the policy allows, in order.
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..=self.max_attempts).filter_map(|attempt| self.delay_for(attempt))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_default_schedule() {
        let delays: Vec<u128> = ReconnectPolicy::new()
            .schedule()
            .map(|d| d.as_millis())
            .collect();

        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000]);
    }

    #[test]
    fn test_no_delay_past_limit() {
        let policy = ReconnectPolicy::new();
        assert_eq!(policy.delay_for(0), None);
        assert_eq!(policy.delay_for(5), Some(Duration::from_secs(16)));
        assert_eq!(policy.delay_for(6), None);
    }

    #[test]
    fn test_disabled() {
        let policy = ReconnectPolicy::disabled();
        assert_eq!(policy.delay_for(1), None);
        assert_eq!(policy.schedule().count(), 0);
    }

    #[test]
    fn test_builder_methods() {
        let policy = ReconnectPolicy::new()
            .with_base_delay(Duration::from_millis(250))
            .with_max_attempts(3);

        let delays: Vec<_> = policy.schedule().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(250),
                Duration::from_millis(500),
                Duration::from_millis(1000),
            ]
        );
    }

    #[test]
    fn test_huge_attempt_saturates() {
        let policy = ReconnectPolicy::new().with_max_attempts(u32::MAX);
        let capped = policy.delay_for(200).expect("within limit");
        assert_eq!(capped, Duration::from_millis(1000) * u32::MAX);
        assert_eq!(policy.delay_for(40), Some(capped));
    }

    proptest! {
        #[test]
        fn prop_each_delay_doubles(base_ms in 1u64..10_000, max in 2u32..12) {
            let policy = ReconnectPolicy::new()
                .with_base_delay(Duration::from_millis(base_ms))
                .with_max_attempts(max);

            let delays: Vec<_> = policy.schedule().collect();
            prop_assert_eq!(delays.len(), max as usize);
            prop_assert_eq!(delays[0], Duration::from_millis(base_ms));
            for pair in delays.windows(2) {
                prop_assert_eq!(pair[1], pair[0] * 2);
            }
        }
    }
}
