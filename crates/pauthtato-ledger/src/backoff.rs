//! Retry delays for lost compare-and-append races.
//!
//! Full jitter: `delay = random(0, min(cap, base * 2^retry))`.

use std::time::Duration;

/// Exponential backoff with full jitter between append attempts.
#[derive(Debug)]
pub(crate) struct Backoff {
    base_ms: u64,
    cap_ms: u64,
    /// Retries taken so far (0-indexed).
    retry: u32,
}

impl Backoff {
    pub(crate) fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base_ms: u64::try_from(base.as_millis()).unwrap_or(u64::MAX),
            cap_ms: u64::try_from(cap.as_millis()).unwrap_or(u64::MAX),
            retry: 0,
        }
    }

    /// Upper bound of the next delay, before jitter.
    fn ceiling_ms(&self) -> u64 {
        let factor = 1u64.checked_shl(self.retry).unwrap_or(u64::MAX);
        self.base_ms.saturating_mul(factor).min(self.cap_ms)
    }

    /// Draw the next delay and advance.
    pub(crate) fn next_delay(&mut self) -> Duration {
        let ceiling = self.ceiling_ms();
        let jittered = if ceiling == 0 {
            0
        } else {
            fastrand::u64(0..=ceiling)
        };
        self.retry = self.retry.saturating_add(1);
        Duration::from_millis(jittered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_delay_bounded_by_base() {
        for _ in 0..100 {
            let mut b = Backoff::new(Duration::from_millis(10), Duration::from_millis(200));
            assert!(b.next_delay() <= Duration::from_millis(10));
        }
    }

    #[test]
    fn ceiling_doubles_until_cap() {
        let mut b = Backoff::new(Duration::from_millis(10), Duration::from_millis(200));
        let mut ceilings = Vec::new();
        for _ in 0..7 {
            ceilings.push(b.ceiling_ms());
            let _ = b.next_delay();
        }
        assert_eq!(ceilings, vec![10, 20, 40, 80, 160, 200, 200]);
    }

    #[test]
    fn delay_never_exceeds_cap() {
        let mut b = Backoff::new(Duration::from_millis(10), Duration::from_millis(50));
        for _ in 0..40 {
            assert!(b.next_delay() <= Duration::from_millis(50));
        }
    }

    #[test]
    fn zero_base_means_no_wait() {
        let mut b = Backoff::new(Duration::ZERO, Duration::from_millis(200));
        for _ in 0..10 {
            assert_eq!(b.next_delay(), Duration::ZERO);
        }
    }

    #[test]
    fn retry_counter_saturates() {
        let mut b = Backoff::new(Duration::from_millis(10), Duration::from_millis(200));
        b.retry = u32::MAX;
        assert!(b.next_delay() <= Duration::from_millis(200));
        assert_eq!(b.retry, u32::MAX);
    }
}
