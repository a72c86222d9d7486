//! 挂起的自动重试：单一截止时间，倒计时从截止时间推导。
//! A pending automatic retry: one deadline, with the displayed countdown
//! derived from it.

use std::time::Duration;
use tokio::time::Instant;

/// A scheduled retry together with the countdown shown while waiting for it.
///
/// 已安排的重试以及等待期间显示的倒计时。
#[derive(Debug, Clone)]
pub(crate) struct RetryCountdown {
    deadline: Instant,
    tick: Duration,
    published: Option<u64>,
}

impl RetryCountdown {
    pub(crate) fn new(now: Instant, delay: Duration, tick: Duration) -> Self {
        Self {
            deadline: now + delay,
            tick: tick.max(Duration::from_millis(1)),
            published: None,
        }
    }

    /// Whole ticks left, rounded up. Reaches 0 exactly at the deadline.
    /// 剩余的完整刻度数（向上取整）。恰好在截止时间变为 0。
    pub(crate) fn remaining(&self, now: Instant) -> u64 {
        let left = self.deadline.saturating_duration_since(now);
        let tick = self.tick.as_nanos();
        u64::try_from(left.as_nanos().div_ceil(tick)).unwrap_or(u64::MAX)
    }

    pub(crate) fn is_due(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    /// The next instant the displayed value changes; the deadline itself once
    /// one tick or less is left.
    ///
    /// 显示值下一次变化的时刻；剩余不足一个刻度时即为截止时间。
    pub(crate) fn next_wake(&self, now: Instant) -> Instant {
        let shown = self.remaining(now);
        if shown <= 1 {
            return self.deadline;
        }
        let ticks_after = u32::try_from(shown - 1).unwrap_or(u32::MAX);
        self.deadline
            .checked_sub(self.tick.saturating_mul(ticks_after))
            .unwrap_or(now)
    }

    /// Records `value` as shown and reports whether it differs from the
    /// previously shown value.
    ///
    /// 记录 `value` 为已显示值，并报告它是否与之前显示的值不同。
    pub(crate) fn publish(&mut self, value: u64) -> bool {
        let changed = self.published != Some(value);
        self.published = Some(value);
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_countdown_derives_from_deadline() {
        let start = Instant::now();
        let countdown =
            RetryCountdown::new(start, Duration::from_millis(3000), Duration::from_secs(1));

        assert_eq!(countdown.remaining(start), 3);
        assert_eq!(countdown.next_wake(start), start + Duration::from_secs(1));

        let t1 = start + Duration::from_millis(1000);
        assert_eq!(countdown.remaining(t1), 2);
        assert_eq!(countdown.next_wake(t1), start + Duration::from_secs(2));

        let t2 = start + Duration::from_millis(2000);
        assert_eq!(countdown.remaining(t2), 1);
        assert_eq!(countdown.next_wake(t2), start + Duration::from_secs(3));
        assert!(!countdown.is_due(t2));

        let t3 = start + Duration::from_millis(3000);
        assert_eq!(countdown.remaining(t3), 0);
        assert!(countdown.is_due(t3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fractional_delay_rounds_up() {
        let start = Instant::now();
        let countdown =
            RetryCountdown::new(start, Duration::from_millis(4500), Duration::from_secs(1));

        assert_eq!(countdown.remaining(start), 5);
        assert_eq!(countdown.next_wake(start), start + Duration::from_millis(500));
        assert_eq!(countdown.remaining(start + Duration::from_millis(500)), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_reports_changes_only() {
        let mut countdown = RetryCountdown::new(
            Instant::now(),
            Duration::from_secs(3),
            Duration::from_secs(1),
        );
        assert!(countdown.publish(3));
        assert!(!countdown.publish(3));
        assert!(countdown.publish(2));
    }
}
