//! Interval backoff for monitors that keep failing

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::defaults;

/// Stretches the check interval after consecutive `down` results.
///
/// Once `consecutive_failures` reaches `failure_threshold` the interval is
/// multiplied by `multiplier^(failures - threshold + 1)`, never more than
/// `max_multiplier`. The first `up` result resets the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    pub failure_threshold: u32,
    pub multiplier: u32,
    pub max_multiplier: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: defaults::BACKOFF_FAILURE_THRESHOLD,
            multiplier: defaults::BACKOFF_MULTIPLIER,
            max_multiplier: defaults::BACKOFF_MAX_MULTIPLIER,
        }
    }
}

impl BackoffPolicy {
    pub fn factor(&self, consecutive_failures: u32) -> u32 {
        if self.failure_threshold == 0 || consecutive_failures < self.failure_threshold {
            return 1;
        }

        let exponent = consecutive_failures - self.failure_threshold + 1;
        let cap = self.max_multiplier.max(1);
        self.multiplier
            .max(1)
            .checked_pow(exponent)
            .map_or(cap, |factor| factor.min(cap))
    }

    pub fn interval(&self, base: Duration, consecutive_failures: u32) -> Duration {
        base.saturating_mul(self.factor(consecutive_failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 60_000)]
    #[case(1, 120_000)]
    #[case(2, 240_000)]
    #[case(3, 240_000)]
    #[case(40, 240_000)]
    fn test_default_policy_intervals(#[case] failures: u32, #[case] expected_ms: u64) {
        let policy = BackoffPolicy::default();
        assert_eq!(
            policy.interval(Duration::from_millis(60_000), failures),
            Duration::from_millis(expected_ms)
        );
    }

    #[rstest]
    #[case(2, 0, 1)]
    #[case(2, 1, 1)]
    #[case(2, 2, 3)]
    #[case(2, 3, 9)]
    #[case(2, 4, 10)]
    fn test_threshold_and_cap(#[case] threshold: u32, #[case] failures: u32, #[case] factor: u32) {
        let policy = BackoffPolicy {
            failure_threshold: threshold,
            multiplier: 3,
            max_multiplier: 10,
        };
        assert_eq!(policy.factor(failures), factor);
    }

    #[test]
    fn test_zero_threshold_disables_backoff() {
        let policy = BackoffPolicy {
            failure_threshold: 0,
            ..BackoffPolicy::default()
        };
        assert_eq!(policy.factor(10), 1);
    }
}
