//! 自动重连的指数退避策略。
//! Exponential backoff policy for automatic reconnects.

use crate::config::RetryConfig;
use std::time::Duration;

/// Computes retry delays and decides whether the retry budget is spent.
///
/// 计算重试延迟并判断重试预算是否已耗尽。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    base_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    max_retries: u32,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            base_delay: config.base_delay,
            max_delay: config.max_delay,
            multiplier: config.multiplier,
            max_retries: config.max_retries,
        }
    }

    /// Delay before the automatic retry that follows `retry_count` retries
    /// already made: `min(base × multiplier^retry_count, max)`.
    ///
    /// 在已进行 `retry_count` 次重试之后，下一次自动重试前的延迟。
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let exponent = i32::try_from(retry_count).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            // A negative multiplier can flip the sign on odd exponents.
            Duration::from_secs_f64(secs.max(0.0))
        }
    }

    /// Whether another automatic retry is allowed after `retry_count` retries.
    ///
    /// 在 `retry_count` 次重试之后是否还允许再次自动重试。
    pub fn allows(&self, retry_count: u32) -> bool {
        retry_count < self.max_retries
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_by_half_and_clamps() {
        let policy = RetryPolicy::default();
        let expected_ms = [3000, 4500, 6750, 10125, 15000, 15000, 15000, 15000];
        for (count, ms) in expected_ms.into_iter().enumerate() {
            assert_eq!(
                policy.delay_for(count as u32).as_millis(),
                ms,
                "retry_count = {count}"
            );
        }
    }

    #[test]
    fn test_huge_retry_count_saturates() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(15));
    }

    #[test]
    fn test_negative_multiplier_never_goes_below_zero() {
        let config = RetryConfig {
            multiplier: -1.5,
            ..RetryConfig::default()
        };
        let policy = RetryPolicy::new(&config);
        assert_eq!(policy.delay_for(1), Duration::ZERO);
        assert_eq!(policy.delay_for(2).as_millis(), 6750);
    }

    #[test]
    fn test_ceiling() {
        let policy = RetryPolicy::default();
        assert!(policy.allows(0));
        assert!(policy.allows(7));
        assert!(!policy.allows(8));
        assert_eq!(policy.max_retries(), 8);
    }
}
